//! URL-based modules.
//!
//! A script import that names a URL is never fetched at build time. It is
//! rewritten to its percent-encoded root-relative form and marked external,
//! so the application's asset middleware serves it on demand.

use std::borrow::Cow;

use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use crate::specifier;

#[derive(Debug, Default)]
pub struct UrlPlugin;

impl UrlPlugin {
    pub fn new() -> Self {
        Self
    }

    fn externalize(specifier_text: &str) -> Option<String> {
        if specifier::is_url(specifier_text) {
            return Some(specifier::encode_url(specifier_text));
        }
        if specifier::is_encoded_url(specifier_text) {
            // Already in served form, keep as-is.
            return Some(specifier_text.to_string());
        }
        None
    }
}

impl Plugin for UrlPlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-url".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let externalized = Self::externalize(args.specifier);

        async move {
            Ok(externalized.map(|id| HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_become_encoded_external_paths() {
        assert_eq!(
            UrlPlugin::externalize("https://cdn.example.test/import-url-module.js"),
            Some("/https%3A%2F%2Fcdn.example.test%2Fimport-url-module.js".to_string())
        );
    }

    #[test]
    fn encoded_urls_stay_unchanged() {
        let encoded = "/https%3A%2F%2Fcdn.example.test%2Ffoo.js";
        assert_eq!(UrlPlugin::externalize(encoded), Some(encoded.to_string()));
    }

    #[test]
    fn local_paths_are_ignored() {
        assert_eq!(UrlPlugin::externalize("/lib/foo.js"), None);
        assert_eq!(UrlPlugin::externalize("./foo.js"), None);
    }
}

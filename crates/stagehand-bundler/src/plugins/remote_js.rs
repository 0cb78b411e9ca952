//! Remote script (`.rjs`) references.
//!
//! A `.rjs` import names a script the application serves itself, so the path
//! is rewritten onto the base URL and left external for the browser to fetch.

use std::borrow::Cow;

use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

#[derive(Debug)]
pub struct RemoteJsPlugin {
    base_url: String,
}

impl RemoteJsPlugin {
    pub fn new(base_url: String) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn rewrite(&self, specifier: &str) -> Option<String> {
        if !specifier.ends_with(".rjs") {
            return None;
        }
        if specifier.starts_with("http://") || specifier.starts_with("https://") {
            return Some(specifier.to_string());
        }
        Some(format!("{}/{}", self.base_url, specifier.trim_start_matches('/')))
    }
}

impl Plugin for RemoteJsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-remote-js".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let rewritten = self.rewrite(args.specifier);

        async move {
            Ok(rewritten.map(|id| HookResolveIdOutput {
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
    fn rewrites_root_relative_remote_scripts() {
        let plugin = RemoteJsPlugin::new("https://example.com".to_string());
        assert_eq!(
            plugin.rewrite("/scripts/widget.rjs"),
            Some("https://example.com/scripts/widget.rjs".to_string())
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let plugin = RemoteJsPlugin::new("https://example.com".to_string());
        assert_eq!(
            plugin.rewrite("https://other.test/widget.rjs"),
            Some("https://other.test/widget.rjs".to_string())
        );
    }

    #[test]
    fn ignores_other_specifiers() {
        let plugin = RemoteJsPlugin::new("https://example.com".to_string());
        assert_eq!(plugin.rewrite("lib/app.js"), None);
    }
}

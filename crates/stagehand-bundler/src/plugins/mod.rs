//! The engine plugin chain.
//!
//! Order is part of the contract: i18n and remote-script rewriting must see
//! specifiers before the import map is applied, URL externalization must
//! run after it, and definition substitution runs over whatever the other
//! plugins loaded.

pub mod define;
pub mod externalize;
pub mod i18n;
pub mod remote_js;
pub mod svg;
pub mod url;

use std::sync::Arc;

use rolldown_plugin::__inner::SharedPluginable;

use crate::{config::ResolvedBuildConfig, css::CssPlugin, remote::RemoteLoader};

pub use define::DefinePlugin;
pub use externalize::ExternalizePlugin;
pub use i18n::I18nPlugin;
pub use remote_js::RemoteJsPlugin;
pub use svg::SvgPlugin;
pub use url::UrlPlugin;

/// Assemble the plugin chain for one build, in its fixed order.
pub fn compose_chain(
    config: &ResolvedBuildConfig,
    remote: Arc<dyn RemoteLoader>,
) -> Vec<SharedPluginable> {
    let mut chain: Vec<SharedPluginable> = Vec::with_capacity(7);
    chain.push(Arc::new(I18nPlugin::new(config.root.clone())));
    chain.push(Arc::new(RemoteJsPlugin::new(config.base_url.clone())));
    chain.push(Arc::new(ExternalizePlugin::new(
        config.root.clone(),
        config.import_map.clone(),
    )));
    chain.push(Arc::new(SvgPlugin::new()));
    chain.push(Arc::new(UrlPlugin::new()));
    chain.push(Arc::new(CssPlugin::new(
        config.root.clone(),
        config.base_url.clone(),
        config.import_map.clone(),
        remote,
        config.minify,
    )));
    chain.push(Arc::new(DefinePlugin::new(&config.definitions)));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::translate,
        env::{CachePolicy, EnvCache, Environment},
        remote::NoRemoteLoader,
        request::BuildRequest,
    };

    #[test]
    fn chain_has_every_stage() {
        let cache = EnvCache::new(CachePolicy::AlwaysRefresh);
        let request = BuildRequest::new("lib/app.js", "/tmp/app");
        let config = translate(&request, Environment::Test, &cache).unwrap();

        let chain = compose_chain(&config, Arc::new(NoRemoteLoader));
        assert_eq!(chain.len(), 7);
    }

    #[test]
    fn plugin_names_are_stable() {
        use rolldown_plugin::Plugin;

        assert_eq!(I18nPlugin::new("/tmp".into()).name(), "stagehand-i18n");
        assert_eq!(RemoteJsPlugin::new(String::new()).name(), "stagehand-remote-js");
        assert_eq!(SvgPlugin::new().name(), "stagehand-svg");
        assert_eq!(UrlPlugin::new().name(), "stagehand-url");
    }
}

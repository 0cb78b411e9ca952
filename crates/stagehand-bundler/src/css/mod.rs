//! Stylesheet processing: `@import` bundling, mixins, CSS Modules scoping,
//! and the engine plugin that serves stylesheets imported from script.

pub(crate) mod bundler;
pub mod mixins;
pub mod modules;

use std::{borrow::Cow, path::PathBuf, sync::Arc};

use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};

use crate::{import_map::ImportMap, remote::RemoteLoader};
use bundler::CssBundler;
use modules::CssModuleDigest;

/// Serves `.css` imports from script modules.
///
/// Every stylesheet an entry script pulls in is bundled (imports, mixins,
/// module scoping) and emitted as a JS module that injects the result into
/// `document.head`. Module stylesheets also export the class-name `Proxy`.
#[derive(Debug)]
pub struct CssPlugin {
    root: PathBuf,
    base_url: String,
    import_map: ImportMap,
    remote: Arc<dyn RemoteLoader>,
    minify: bool,
}

impl CssPlugin {
    pub fn new(
        root: PathBuf,
        base_url: String,
        import_map: ImportMap,
        remote: Arc<dyn RemoteLoader>,
        minify: bool,
    ) -> Self {
        Self { root, base_url, import_map, remote, minify }
    }
}

impl Plugin for CssPlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-css".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let root = self.root.clone();
        let base_url = self.base_url.clone();
        let import_map = self.import_map.clone();
        let remote = Arc::clone(&self.remote);
        let minify = self.minify;

        async move {
            if !id.ends_with(".css") {
                return Ok(None);
            }

            let rel = match PathBuf::from(&id).strip_prefix(&root) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => id.trim_start_matches('/').to_string(),
            };

            let css = CssBundler::new(&root, &base_url, &import_map, remote.as_ref(), minify)
                .bundle(&rel)?;

            let digest =
                modules::is_module_path(&rel).then(|| CssModuleDigest::for_path(&rel));
            let code = modules::injection_module(&rel, &css, digest.as_ref());

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

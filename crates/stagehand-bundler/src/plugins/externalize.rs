//! Import-map application and root-absolute resolution.
//!
//! Runs ahead of the engine's own resolver: bare specifiers go through the
//! import map, root-absolute paths (`/lib/foo.js`) resolve against the
//! application root instead of the filesystem root, and a mapping that
//! lands on a URL is externalized in its encoded form.

use std::borrow::Cow;
use std::path::PathBuf;

use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use crate::{import_map::ImportMap, specifier};

#[derive(Debug)]
pub struct ExternalizePlugin {
    root: PathBuf,
    import_map: ImportMap,
}

enum Resolution {
    Local(String),
    External(String),
}

impl ExternalizePlugin {
    pub fn new(root: PathBuf, import_map: ImportMap) -> Self {
        Self { root, import_map }
    }

    fn resolve(&self, raw: &str, importer: Option<&str>) -> Option<Resolution> {
        // URL handling belongs to the url plugin; only rewrite what the
        // import map or the root can answer.
        if specifier::is_url(raw) || specifier::is_encoded_url(raw) {
            return None;
        }

        let mapped = self.import_map.resolve(raw, importer);
        let target = mapped.as_deref().unwrap_or(raw);

        if specifier::is_url(target) {
            return Some(Resolution::External(specifier::encode_url(target)));
        }

        if let Some(rooted) = target.strip_prefix('/') {
            let absolute = self.root.join(rooted);
            return Some(Resolution::Local(absolute.to_string_lossy().into_owned()));
        }

        // A bare specifier remapped to a relative path still needs the
        // engine's resolver; hand the rewritten form back as local only
        // when the map actually changed it.
        match mapped {
            Some(target) => Some(Resolution::Local(self.root.join(target).to_string_lossy().into_owned())),
            None => None,
        }
    }
}

impl Plugin for ExternalizePlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-externalize".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let resolution = self.resolve(args.specifier, args.importer);

        async move {
            Ok(match resolution {
                Some(Resolution::Local(id)) => {
                    Some(HookResolveIdOutput { id: id.into(), ..Default::default() })
                }
                Some(Resolution::External(id)) => Some(HookResolveIdOutput {
                    id: id.into(),
                    external: Some(ResolvedExternal::Bool(true)),
                    ..Default::default()
                }),
                None => None,
            })
        }
    }
}

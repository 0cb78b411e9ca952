//! The `@stagehand/i18n` virtual module.
//!
//! Serves the application's locale files (`config/locales/*.yml`) as a
//! single JSON default export, merged in file-name order.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

/// Bare specifier served by this plugin.
pub const SPECIFIER: &str = "@stagehand/i18n";

const VIRTUAL_ID: &str = "\0stagehand:i18n";

#[derive(Debug)]
pub struct I18nPlugin {
    root: PathBuf,
}

impl I18nPlugin {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn translations(root: &PathBuf) -> anyhow::Result<serde_json::Value> {
        let dir = root.join("config/locales");
        let mut merged = serde_json::Value::Object(serde_json::Map::new());

        let mut paths: Vec<PathBuf> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yml") | Some("yaml")
                    )
                })
                .collect(),
            // No locales directory means no translations.
            Err(_) => return Ok(merged),
        };
        paths.sort();

        for path in paths {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read locale file {}", path.display()))?;
            let value: serde_json::Value = serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse locale file {}", path.display()))?;
            deep_merge(&mut merged, value);
        }

        Ok(merged)
    }
}

fn deep_merge(target: &mut serde_json::Value, incoming: serde_json::Value) {
    match (target, incoming) {
        (serde_json::Value::Object(target), serde_json::Value::Object(incoming)) => {
            for (key, value) in incoming {
                deep_merge(target.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, incoming) => *target = incoming,
    }
}

impl Plugin for I18nPlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-i18n".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let matched = args.specifier == SPECIFIER;
        async move {
            if !matched {
                return Ok(None);
            }
            Ok(Some(HookResolveIdOutput { id: VIRTUAL_ID.into(), ..Default::default() }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let matched = args.id == VIRTUAL_ID;
        let root = self.root.clone();

        async move {
            if !matched {
                return Ok(None);
            }

            let translations = Self::translations(&root)?;
            let code = format!("export default {translations};");

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_locales_directory_yields_empty_object() {
        let tmp = tempfile::tempdir().unwrap();
        let translations = I18nPlugin::translations(&tmp.path().to_path_buf()).unwrap();
        assert_eq!(translations, serde_json::json!({}));
    }

    #[test]
    fn merges_locale_files_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("config/locales");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("en.yml"), "en:\n  hello: Hello\n  bye: Bye\n").unwrap();
        std::fs::write(dir.join("en_extra.yml"), "en:\n  hello: Hi\n").unwrap();

        let translations = I18nPlugin::translations(&tmp.path().to_path_buf()).unwrap();
        assert_eq!(translations["en"]["hello"], "Hi");
        assert_eq!(translations["en"]["bye"], "Bye");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("config/locales");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bad.yml"), "en: [unclosed\n").unwrap();

        assert!(I18nPlugin::translations(&tmp.path().to_path_buf()).is_err());
    }
}

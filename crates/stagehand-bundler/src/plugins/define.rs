//! Compile-time symbol substitution for script modules.

use std::borrow::Cow;
use std::sync::Arc;

use regex::{Captures, Regex};
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};

use crate::env::EnvDefinitions;

/// Replaces defined symbolic names (`stagehand.env.API_KEY`,
/// `process.env.NODE_ENV`, the `stagehand.env` sentinel) with their literal
/// values in JS-family modules.
///
/// Longer names are substituted first so `stagehand.env.RAILS_ENV` is never
/// clobbered by the bare `stagehand.env` sentinel, and a name is only
/// matched as a whole member expression.
#[derive(Debug)]
pub struct DefinePlugin {
    // (pattern, replacement) pairs, longest name first.
    substitutions: Arc<Vec<(Regex, String)>>,
}

impl DefinePlugin {
    pub fn new(definitions: &EnvDefinitions) -> Self {
        let mut ordered: Vec<(&String, &String)> = definitions.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        let substitutions = ordered
            .into_iter()
            .filter_map(|(name, value)| {
                let pattern =
                    format!(r"(^|[^\w$.]){}($|[^\w$.])", regex::escape(name));
                Regex::new(&pattern).ok().map(|re| (re, value.clone()))
            })
            .collect();

        Self { substitutions: Arc::new(substitutions) }
    }

    fn substitute(substitutions: &[(Regex, String)], code: &str) -> Option<String> {
        let mut current = Cow::Borrowed(code);
        for (re, value) in substitutions {
            // The boundary groups consume a character, so adjacent
            // occurrences need another pass. Bounded to rule out cycling on
            // a replacement that reintroduces its own name.
            for _ in 0..8 {
                if !re.is_match(&current) {
                    break;
                }
                let replaced = re
                    .replace_all(&current, |captures: &Captures<'_>| {
                        format!("{}{}{}", &captures[1], value, &captures[2])
                    })
                    .into_owned();
                current = Cow::Owned(replaced);
            }
        }

        match current {
            Cow::Borrowed(_) => None,
            Cow::Owned(replaced) => Some(replaced),
        }
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-define".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let module_type = args.module_type.clone();
        let code = args.code.to_string();
        let substitutions = Arc::clone(&self.substitutions);

        async move {
            if !matches!(
                module_type,
                ModuleType::Js | ModuleType::Jsx | ModuleType::Ts | ModuleType::Tsx
            ) {
                return Ok(None);
            }

            Ok(Self::substitute(&substitutions, &code).map(|code| HookTransformOutput {
                code: Some(code),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions(pairs: &[(&str, &str)]) -> EnvDefinitions {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn apply(defs: &EnvDefinitions, code: &str) -> Option<String> {
        let plugin = DefinePlugin::new(defs);
        DefinePlugin::substitute(&plugin.substitutions, code)
    }

    #[test]
    fn replaces_member_expressions() {
        let defs = definitions(&[("stagehand.env.API_KEY", "'abc'")]);
        let out = apply(&defs, "console.log(stagehand.env.API_KEY);").unwrap();
        assert_eq!(out, "console.log('abc');");
    }

    #[test]
    fn longest_name_wins_over_the_sentinel() {
        let defs = definitions(&[
            ("stagehand.env", "undefined"),
            ("stagehand.env.RAILS_ENV", "'test'"),
        ]);
        let out = apply(&defs, "if (stagehand.env) { use(stagehand.env.RAILS_ENV); }").unwrap();
        assert_eq!(out, "if (undefined) { use('test'); }");
    }

    #[test]
    fn undefined_namespaced_keys_are_left_alone() {
        let defs = definitions(&[("stagehand.env", "undefined")]);
        let out = apply(&defs, "use(stagehand.env.NOT_DEFINED);");
        assert!(out.is_none());
    }

    #[test]
    fn does_not_touch_longer_identifiers() {
        let defs = definitions(&[("process.env.NODE_ENV", "'test'")]);
        assert!(apply(&defs, "my.process.env.NODE_ENV").is_none());
        assert!(apply(&defs, "process.env.NODE_ENV_EXTRA").is_none());
    }

    #[test]
    fn returns_none_when_nothing_matches() {
        let defs = definitions(&[("stagehand.env.A", "'1'")]);
        assert!(apply(&defs, "console.log('hi');").is_none());
    }
}

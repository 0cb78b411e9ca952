//! SVG imports from script.
//!
//! An `.svg` file imported by a script module is inlined as a JSX component
//! so it renders without a network round trip.

use std::borrow::Cow;

use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
};

#[derive(Debug, Default)]
pub struct SvgPlugin;

impl SvgPlugin {
    pub fn new() -> Self {
        Self
    }

    fn component(svg: &str) -> String {
        // Strip any XML declaration; JSX only wants the element.
        let markup = svg
            .lines()
            .filter(|line| !line.trim_start().starts_with("<?xml"))
            .collect::<Vec<_>>()
            .join("\n");

        format!("export default function() {{\n  return ({});\n}}\n", markup.trim())
    }
}

impl Plugin for SvgPlugin {
    fn name(&self) -> Cow<'static, str> {
        "stagehand-svg".into()
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

        async move {
            if !id.ends_with(".svg") {
                return Ok(None);
            }

            let svg = std::fs::read_to_string(&id)
                .with_context(|| format!("Failed to read SVG file: {id}"))?;

            Ok(Some(HookLoadOutput {
                code: Self::component(&svg).into(),
                module_type: Some(ModuleType::Jsx),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_markup_in_a_component() {
        let module = SvgPlugin::component("<svg viewBox=\"0 0 10 10\"><path d=\"M0 0\"/></svg>");
        assert!(module.starts_with("export default function()"));
        assert!(module.contains("<svg viewBox=\"0 0 10 10\">"));
    }

    #[test]
    fn drops_the_xml_declaration() {
        let module =
            SvgPlugin::component("<?xml version=\"1.0\"?>\n<svg><path d=\"M0 0\"/></svg>");
        assert!(!module.contains("<?xml"));
        assert!(module.contains("<svg>"));
    }
}

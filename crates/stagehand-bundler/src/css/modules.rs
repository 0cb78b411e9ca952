//! CSS Modules scoping and the browser injection contract.
//!
//! A stylesheet whose file name carries a `.module.` infix gets every class
//! selector suffixed with a digest derived from its root-relative path. When
//! such a stylesheet is imported from script, the emitted module injects the
//! scoped CSS into `document.head` and default-exports a `Proxy` that maps
//! local class names to their scoped forms.

use lightningcss::{
    css_modules::{self, Pattern},
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
    targets::{Features, Targets},
};
use rustc_hash::FxHashMap;

use crate::{Error, Result, digest::short_digest};

/// The scoping digest of one module stylesheet.
///
/// Derived from the stylesheet's root-relative path, so two importers of the
/// same file always agree on the scoped names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssModuleDigest(String);

impl CssModuleDigest {
    pub fn for_path(root_relative: &str) -> Self {
        Self(short_digest(root_relative.trim_start_matches('/').as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CssModuleDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a path names a module stylesheet (`*.module.css` and friends).
pub fn is_module_path(path: &str) -> bool {
    path.contains(".module.")
}

/// Build-side equivalent of the runtime `Proxy`: scoped name lookup with
/// optional explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct ClassNameMap {
    digest: Option<CssModuleDigest>,
    overrides: FxHashMap<String, String>,
}

impl ClassNameMap {
    pub fn new(digest: CssModuleDigest) -> Self {
        Self { digest: Some(digest), overrides: FxHashMap::default() }
    }

    pub fn insert(&mut self, local: impl Into<String>, scoped: impl Into<String>) {
        self.overrides.insert(local.into(), scoped.into());
    }

    /// Look up a local class name, synthesizing `<local><digest>` when no
    /// override exists.
    pub fn resolve(&self, local: &str) -> String {
        if let Some(scoped) = self.overrides.get(local) {
            return scoped.clone();
        }
        match &self.digest {
            Some(digest) => format!("{local}{digest}"),
            None => local.to_string(),
        }
    }
}

/// Rename every class selector in `source` to `<name><digest>`.
///
/// Renaming happens exactly once per selector even when the same class
/// appears in multiple rules.
pub fn scope_classes(
    source: &str,
    root_relative: &str,
    digest: &CssModuleDigest,
    minify: bool,
) -> Result<String> {
    let pattern_source = format!("[local]{digest}");
    let pattern = Pattern::parse(&pattern_source).map_err(|e| Error::Css {
        path: root_relative.to_string(),
        message: format!("invalid scoping pattern: {e:?}"),
    })?;

    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: root_relative.to_string(),
            css_modules: Some(css_modules::Config { pattern, ..Default::default() }),
            ..Default::default()
        },
    )
    .map_err(|e| Error::Css {
        path: root_relative.to_string(),
        message: format!("parse failed: {e}"),
    })?;

    // Nesting is always downleveled for browsers that lack support.
    let targets = Targets { include: Features::Nesting, ..Targets::default() };
    stylesheet
        .minify(MinifyOptions { targets, ..Default::default() })
        .map_err(|e| Error::Css {
            path: root_relative.to_string(),
            message: format!("transform failed: {e:?}"),
        })?;

    let printed = stylesheet
        .to_css(PrinterOptions { minify, targets, ..Default::default() })
        .map_err(|e| Error::Css {
            path: root_relative.to_string(),
            message: format!("print failed: {e:?}"),
        })?;

    Ok(printed.code)
}

/// Emit the script module for a stylesheet imported from JS.
///
/// The stylesheet is injected once per digest: an existing `style` element
/// with the digest id, or a `link` already serving the same href, suppresses
/// injection. Module stylesheets additionally default-export the class-name
/// `Proxy`.
pub fn injection_module(root_relative: &str, css: &str, digest: Option<&CssModuleDigest>) -> String {
    let href = format!("/{}", root_relative.trim_start_matches('/'));
    let style_id = match digest {
        Some(digest) => format!("_{digest}"),
        None => format!("_{}", short_digest(href.as_bytes())),
    };
    let escaped = escape_template_literal(css);

    let mut module = format!(
        r##"const existingStyle = document.querySelector("#{style_id}");
const existingLink = document.querySelector('link[href="{href}"]');
if (!existingStyle && !existingLink) {{
  const e = document.createElement("style");
  e.id = "{style_id}";
  e.dataset.href = "{href}";
  e.appendChild(document.createTextNode(`{escaped}`));
  document.head.insertBefore(e, document.querySelector("style"));
}}
"##
    );

    if let Some(digest) = digest {
        module.push_str(&format!(
            r##"export default new Proxy({{}}, {{
  get(target, prop, receiver) {{
    if (prop in target || typeof prop === "symbol") {{
      return Reflect.get(target, prop, receiver);
    }} else {{
      return prop + "{digest}";
    }}
  }}
}});
"##
        ));
    }

    module
}

fn escape_template_literal(css: &str) -> String {
    css.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_for_a_path() {
        let a = CssModuleDigest::for_path("lib/styles.module.css");
        let b = CssModuleDigest::for_path("lib/styles.module.css");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 8);
    }

    #[test]
    fn digest_ignores_leading_slash() {
        let a = CssModuleDigest::for_path("/lib/styles.module.css");
        let b = CssModuleDigest::for_path("lib/styles.module.css");
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_get_different_digests() {
        let a = CssModuleDigest::for_path("lib/a.module.css");
        let b = CssModuleDigest::for_path("lib/b.module.css");
        assert_ne!(a, b);
    }

    #[test]
    fn recognises_module_infix() {
        assert!(is_module_path("lib/styles.module.css"));
        assert!(!is_module_path("lib/styles.css"));
    }

    #[test]
    fn scopes_each_class_selector_once() {
        let digest = CssModuleDigest::for_path("lib/a.module.css");
        let css = ".base { color: red; }\n.base:hover { color: blue; }";
        let scoped = scope_classes(css, "lib/a.module.css", &digest, false).unwrap();

        let scoped_name = format!(".base{digest}");
        assert_eq!(scoped.matches(&scoped_name).count(), 2);
        let double = format!(".base{digest}{digest}");
        assert!(!scoped.contains(&double));
    }

    #[test]
    fn class_name_map_synthesizes_scoped_names() {
        let digest = CssModuleDigest::for_path("lib/a.module.css");
        let suffix = digest.as_str().to_string();
        let mut map = ClassNameMap::new(digest);
        assert_eq!(map.resolve("title"), format!("title{suffix}"));

        map.insert("title", "custom");
        assert_eq!(map.resolve("title"), "custom");
    }

    #[test]
    fn injection_module_carries_digest_id_and_href() {
        let digest = CssModuleDigest::for_path("lib/styles.module.css");
        let module =
            injection_module("lib/styles.module.css", ".a { color: pink; }", Some(&digest));

        assert!(module.contains(&format!("\"#_{digest}\"")));
        assert!(module.contains("link[href=\"/lib/styles.module.css\"]"));
        assert!(module.contains("document.head.insertBefore(e, document.querySelector(\"style\"));"));
        assert!(module.contains(&format!("return prop + \"{digest}\";")));
    }

    #[test]
    fn plain_stylesheets_get_no_proxy_export() {
        let module = injection_module("lib/styles.css", ".a { color: red; }", None);
        assert!(!module.contains("Proxy"));
        assert!(module.contains("createTextNode"));
    }

    #[test]
    fn template_literal_metacharacters_are_escaped() {
        let module = injection_module("lib/a.css", ".a { content: \"`${x}\"; }", None);
        assert!(module.contains("\\`"));
        assert!(module.contains("\\${"));
    }
}

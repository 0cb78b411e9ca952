//! Mixin folding for stylesheets.
//!
//! Declarations of the form `@mixin <name> from url('<path>');` are replaced
//! with the body of a matching `@define-mixin <name> { ... }` block from the
//! referenced stylesheet. A bare `@mixin <name>;` looks the name up in the
//! current file. Folding happens before module scoping so mixin-provided
//! classes are scoped like local ones.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::{Error, Result, remote::RemoteLoader, specifier};

// Mixin source folding runs a few passes so mixins may reference mixins, but
// not unboundedly.
const MAX_DEPTH: usize = 8;

fn mixin_reference_re() -> Regex {
    Regex::new(r#"@mixin\s+([\w-]+)(?:\s+from\s+url\(\s*['"]?([^'")]+)['"]?\s*\))?\s*;"#)
        .unwrap_or_else(|e| unreachable!("mixin reference pattern: {e}"))
}

/// Extract `@define-mixin <name> { ... }` blocks, returning name to body.
/// The definitions themselves are stripped from ordinary output by the
/// caller keeping only non-definition text.
pub fn parse_definitions(source: &str) -> FxHashMap<String, String> {
    let mut definitions = FxHashMap::default();
    let mut rest = source;

    while let Some(at) = rest.find("@define-mixin") {
        let after = &rest[at + "@define-mixin".len()..];
        let Some(open) = after.find('{') else { break };
        let name = after[..open].trim().to_string();

        let body_start = open + 1;
        let Some(body_len) = matching_brace(&after[body_start..]) else { break };
        let body = after[body_start..body_start + body_len].trim().to_string();

        if !name.is_empty() {
            definitions.insert(name, body);
        }
        rest = &after[body_start + body_len + 1..];
    }

    definitions
}

/// Remove `@define-mixin` blocks from a stylesheet, leaving the rest intact.
pub fn strip_definitions(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(at) = rest.find("@define-mixin") {
        out.push_str(&rest[..at]);
        let after = &rest[at..];
        let Some(open) = after.find('{') else {
            rest = &after["@define-mixin".len()..];
            continue;
        };
        match matching_brace(&after[open + 1..]) {
            Some(body_len) => rest = &after[open + 1 + body_len + 1..],
            None => {
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolves mixin sources for one stylesheet.
pub struct MixinResolver<'a> {
    root: &'a Path,
    base_url: &'a str,
    remote: &'a dyn RemoteLoader,
}

impl<'a> MixinResolver<'a> {
    pub fn new(root: &'a Path, base_url: &'a str, remote: &'a dyn RemoteLoader) -> Self {
        Self { root, base_url, remote }
    }

    /// Fold every `@mixin` reference in `source`. `containing` is the
    /// stylesheet's own path, used to resolve relative references.
    pub fn apply(&self, source: &str, containing: &Path) -> Result<String> {
        let re = mixin_reference_re();
        let local_definitions = parse_definitions(source);
        let mut current = strip_definitions(source);

        for _ in 0..MAX_DEPTH {
            if !current.contains("@mixin") {
                break;
            }

            let mut next = String::with_capacity(current.len());
            let mut last = 0usize;
            for captures in re.captures_iter(&current) {
                let whole = captures.get(0).unwrap_or_else(|| unreachable!("group 0"));
                let name = &captures[1];

                next.push_str(&current[last..whole.start()]);
                last = whole.end();

                let body = match captures.get(2) {
                    Some(url) => self.lookup_external(name, url.as_str(), containing)?,
                    None => local_definitions.get(name).cloned().ok_or_else(|| Error::Css {
                        path: containing.display().to_string(),
                        message: format!("mixin \"{name}\" is not defined"),
                    })?,
                };
                next.push_str(&body);
            }
            next.push_str(&current[last..]);

            if next == current {
                break;
            }
            current = next;
        }

        Ok(current)
    }

    fn lookup_external(&self, name: &str, url: &str, containing: &Path) -> Result<String> {
        let source = self.load_source(url, containing)?;
        parse_definitions(&source).remove(name).ok_or_else(|| Error::Css {
            path: containing.display().to_string(),
            message: format!("mixin \"{name}\" is not defined in {url}"),
        })
    }

    fn load_source(&self, url: &str, containing: &Path) -> Result<String> {
        if specifier::is_url(url) {
            // A remote reference whose origin is the application itself is
            // served from the local root.
            if !self.base_url.is_empty() {
                if let Some(path) = url.strip_prefix(self.base_url.trim_end_matches('/')) {
                    return self.read_rooted(path, containing, url);
                }
            }
            return self.remote.fetch(url).ok_or_else(|| Error::Css {
                path: containing.display().to_string(),
                message: format!("cannot load remote mixin source {url}"),
            });
        }

        if let Some(rooted) = url.strip_prefix('/') {
            return self.read_rooted(rooted, containing, url);
        }

        let dir = containing.parent().unwrap_or(Path::new(""));
        let resolved: PathBuf = dir.join(url).clean();
        std::fs::read_to_string(&resolved).map_err(|e| Error::Css {
            path: containing.display().to_string(),
            message: format!("cannot read mixin source {url}: {e}"),
        })
    }

    fn read_rooted(&self, rooted: &str, containing: &Path, url: &str) -> Result<String> {
        let resolved = self.root.join(rooted.trim_start_matches('/'));
        std::fs::read_to_string(&resolved).map_err(|e| Error::Css {
            path: containing.display().to_string(),
            message: format!("cannot read mixin source {url}: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::NoRemoteLoader;

    #[test]
    fn parses_definition_blocks() {
        let source = "@define-mixin title { color: red; font-size: 20px; }\n.a { color: blue; }";
        let definitions = parse_definitions(source);
        assert_eq!(definitions["title"], "color: red; font-size: 20px;");
    }

    #[test]
    fn strips_definition_blocks() {
        let source = "@define-mixin title { color: red; }\n.a { color: blue; }";
        assert_eq!(strip_definitions(source).trim(), ".a { color: blue; }");
    }

    #[test]
    fn handles_nested_braces_in_definitions() {
        let source = "@define-mixin media { @media screen { color: red; } }";
        let definitions = parse_definitions(source);
        assert_eq!(definitions["media"], "@media screen { color: red; }");
    }

    #[test]
    fn folds_local_mixin_references() {
        let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let resolver = MixinResolver::new(tmp.path(), "", &NoRemoteLoader);
        let source = "@define-mixin red { color: red; }\na { @mixin red; font-size: 20px; }";

        let folded = resolver.apply(source, Path::new("lib/a.css")).unwrap();
        assert!(folded.contains("a { color: red; font-size: 20px; }"));
        assert!(!folded.contains("@define-mixin"));
    }

    #[test]
    fn folds_mixin_from_root_absolute_url() {
        let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::create_dir_all(tmp.path().join("lib")).unwrap();
        std::fs::write(
            tmp.path().join("lib/mixins.css"),
            "@define-mixin red { color: red; }",
        )
        .unwrap();

        let resolver = MixinResolver::new(tmp.path(), "", &NoRemoteLoader);
        let folded = resolver
            .apply("a { @mixin red from url('/lib/mixins.css'); }", Path::new("lib/a.css"))
            .unwrap();
        assert!(folded.contains("a { color: red; }"));
    }

    #[test]
    fn folds_mixin_from_application_origin_url() {
        let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::create_dir_all(tmp.path().join("lib")).unwrap();
        std::fs::write(
            tmp.path().join("lib/mixins.css"),
            "@define-mixin red { color: red; }",
        )
        .unwrap();

        let resolver = MixinResolver::new(tmp.path(), "https://example.com", &NoRemoteLoader);
        let folded = resolver
            .apply(
                "a { @mixin red from url('https://example.com/lib/mixins.css'); }",
                Path::new("lib/a.css"),
            )
            .unwrap();
        assert!(folded.contains("a { color: red; }"));
    }

    #[test]
    fn unknown_mixin_is_an_error() {
        let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let resolver = MixinResolver::new(tmp.path(), "", &NoRemoteLoader);
        let result = resolver.apply("a { @mixin nope; }", Path::new("lib/a.css"));
        assert!(result.is_err());
    }
}

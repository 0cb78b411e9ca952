//! Import map parsing and specifier lookup.
//!
//! An import map is a JSON document mapping bare specifiers to resolvable
//! URLs or paths, optionally scoped by importer prefix:
//!
//! ```json
//! {
//!   "imports": { "react": "https://esm.sh/react@18" },
//!   "scopes": { "/admin/": { "react": "/vendor/react-admin.js" } }
//! }
//! ```
//!
//! Parsing happens before any other resolution step; a parse failure aborts
//! the whole build request.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;

use crate::{Error, Result};

/// Parsed import map, consulted during module specifier resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportMap {
    #[serde(default)]
    imports: FxHashMap<String, String>,
    #[serde(default)]
    scopes: FxHashMap<String, FxHashMap<String, String>>,
}

impl ImportMap {
    /// Parse an import map from inline bytes and/or a file path relative to
    /// `root`. Inline contents win when both are given. With neither, an
    /// empty map is returned and every lookup declines.
    pub fn parse(contents: Option<&[u8]>, path: Option<&str>, root: &Path) -> Result<ImportMap> {
        if let Some(rel) = path {
            if rel.ends_with(".js") || rel.ends_with(".mjs") {
                return Err(Error::ImportMapParse(
                    "JavaScript import maps are not supported; use a JSON document".to_string(),
                ));
            }
        }

        let bytes = match (contents, path) {
            (Some(bytes), _) => bytes.to_vec(),
            (None, Some(rel)) => std::fs::read(root.join(rel)).map_err(|e| {
                Error::ImportMapParse(format!("could not read {rel}: {e}"))
            })?,
            (None, None) => return Ok(ImportMap::default()),
        };

        serde_json::from_slice(&bytes).map_err(|e| Error::ImportMapParse(e.to_string()))
    }

    /// Look up a specifier, preferring a matching scope for `importer` over
    /// the top-level imports. Exact entries win over prefix (trailing-slash)
    /// entries; the longest matching prefix is used.
    pub fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<String> {
        if let Some(importer) = importer {
            let mut scope_prefixes: Vec<&String> = self
                .scopes
                .keys()
                .filter(|prefix| importer.starts_with(prefix.as_str()))
                .collect();
            scope_prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));

            for prefix in scope_prefixes {
                if let Some(mapped) = lookup(&self.scopes[prefix], specifier) {
                    return Some(mapped);
                }
            }
        }

        lookup(&self.imports, specifier)
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.is_empty()
    }
}

fn lookup(map: &FxHashMap<String, String>, specifier: &str) -> Option<String> {
    if let Some(exact) = map.get(specifier) {
        return Some(exact.clone());
    }

    // Trailing-slash entries remap whole prefixes, longest first.
    let mut prefixes: Vec<&String> = map
        .keys()
        .filter(|k| k.ends_with('/') && specifier.starts_with(k.as_str()))
        .collect();
    prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));

    prefixes.first().map(|prefix| {
        let rest = &specifier[prefix.len()..];
        format!("{}{rest}", map[prefix.as_str()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(json: &str) -> ImportMap {
        ImportMap::parse(Some(json.as_bytes()), None, &PathBuf::from("/tmp")).unwrap()
    }

    #[test]
    fn resolves_exact_entry() {
        let map = parse(r#"{"imports": {"react": "https://esm.sh/react@18"}}"#);
        assert_eq!(
            map.resolve("react", None).unwrap(),
            "https://esm.sh/react@18"
        );
        assert!(map.resolve("vue", None).is_none());
    }

    #[test]
    fn resolves_prefix_entry() {
        let map = parse(r#"{"imports": {"lib/": "/src/lib/"}}"#);
        assert_eq!(map.resolve("lib/util.js", None).unwrap(), "/src/lib/util.js");
    }

    #[test]
    fn scope_wins_over_top_level() {
        let map = parse(
            r#"{
                "imports": {"react": "/vendor/react.js"},
                "scopes": {"/admin/": {"react": "/vendor/react-admin.js"}}
            }"#,
        );
        assert_eq!(
            map.resolve("react", Some("/admin/panel.js")).unwrap(),
            "/vendor/react-admin.js"
        );
        assert_eq!(
            map.resolve("react", Some("/app.js")).unwrap(),
            "/vendor/react.js"
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err =
            ImportMap::parse(Some(b"{oops"), None, &PathBuf::from("/tmp")).unwrap_err();
        assert!(matches!(err, Error::ImportMapParse(_)));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = ImportMap::parse(None, Some("nope/import_map.json"), &PathBuf::from("/tmp"))
            .unwrap_err();
        assert!(matches!(err, Error::ImportMapParse(_)));
    }

    #[test]
    fn javascript_documents_are_rejected() {
        let err = ImportMap::parse(None, Some("config/import_map.js"), &PathBuf::from("/tmp"))
            .unwrap_err();
        assert!(err.to_string().contains("JavaScript import maps are not supported"));
    }

    #[test]
    fn empty_sources_give_empty_map() {
        let map = ImportMap::parse(None, None, &PathBuf::from("/tmp")).unwrap();
        assert!(map.is_empty());
    }
}

//! Recursive `@import` bundling for stylesheets.
//!
//! Imported files are emitted before their importer, each prefixed with a
//! `/* <path> */` header so the origin of every rule stays visible in
//! development output. Module stylesheets are digest-scoped as they are
//! folded in, and a module imported by another module scopes with the
//! importer's digest so both share one namespace.

use std::path::{Path, PathBuf};

use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
    targets::{Features, Targets},
};
use path_clean::PathClean;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::{
    Error, Result,
    css::{
        mixins::MixinResolver,
        modules::{self, CssModuleDigest},
    },
    import_map::ImportMap,
    remote::RemoteLoader,
    specifier,
};

fn import_re() -> Regex {
    Regex::new(r#"@import\s+(?:url\(\s*)?['"]([^'"]+)['"]\s*\)?[^;]*;"#)
        .unwrap_or_else(|e| unreachable!("import pattern: {e}"))
}

pub struct CssBundler<'a> {
    root: &'a Path,
    base_url: &'a str,
    import_map: &'a ImportMap,
    remote: &'a dyn RemoteLoader,
    minify: bool,
}

impl<'a> CssBundler<'a> {
    pub fn new(
        root: &'a Path,
        base_url: &'a str,
        import_map: &'a ImportMap,
        remote: &'a dyn RemoteLoader,
        minify: bool,
    ) -> Self {
        Self { root, base_url, import_map, remote, minify }
    }

    /// Bundle the stylesheet at `entry` (root-relative) into a single
    /// buffer.
    pub fn bundle(&self, entry: &str) -> Result<String> {
        let entry = entry.trim_start_matches('/').to_string();
        let mut visited = FxHashSet::default();
        let mut out = String::new();
        self.bundle_file(&entry, None, &mut visited, &mut out)?;

        if self.minify {
            return self.reprint(&out, &entry);
        }
        Ok(out)
    }

    fn bundle_file(
        &self,
        rel: &str,
        inherited: Option<&CssModuleDigest>,
        visited: &mut FxHashSet<String>,
        out: &mut String,
    ) -> Result<()> {
        if !visited.insert(rel.to_string()) {
            return Ok(());
        }

        let absolute = self.root.join(rel);
        let source = std::fs::read_to_string(&absolute).map_err(|_| Error::Css {
            path: rel.to_string(),
            message: format!("Could not resolve \"{rel}\""),
        })?;

        let resolver = MixinResolver::new(self.root, self.base_url, self.remote);
        let folded = resolver.apply(&source, &absolute)?;

        // A module scopes with its importer's digest when that importer is
        // itself a module; otherwise it gets its own.
        let digest = if modules::is_module_path(rel) {
            Some(inherited.cloned().unwrap_or_else(|| CssModuleDigest::for_path(rel)))
        } else {
            None
        };

        let re = import_re();
        let mut body = String::with_capacity(folded.len());
        let mut last = 0usize;
        for captures in re.captures_iter(&folded) {
            let whole = captures.get(0).unwrap_or_else(|| unreachable!("group 0"));
            let target = &captures[1];

            body.push_str(&folded[last..whole.start()]);
            last = whole.end();

            if specifier::is_url(target) {
                // Remote imports stay external.
                body.push_str(whole.as_str());
                continue;
            }

            let child = self.resolve_import(target, rel)?;
            self.bundle_file(&child, digest.as_ref(), visited, out)?;
        }
        body.push_str(&folded[last..]);

        let content = match &digest {
            Some(digest) => modules::scope_classes(&body, rel, digest, false)?,
            None => body,
        };

        out.push_str(&format!("/* {rel} */\n"));
        out.push_str(content.trim());
        out.push('\n');
        Ok(())
    }

    fn resolve_import(&self, target: &str, importer: &str) -> Result<String> {
        if let Some(rooted) = target.strip_prefix('/') {
            return Ok(rooted.to_string());
        }

        if target.starts_with('.') {
            let dir = Path::new(importer).parent().unwrap_or(Path::new(""));
            let joined: PathBuf = dir.join(target).clean();
            return Ok(joined.to_string_lossy().into_owned());
        }

        // Bare specifier. The import map wins, then package resolution.
        if let Some(mapped) = self.import_map.resolve(target, Some(importer)) {
            if let Some(rooted) = mapped.strip_prefix('/') {
                return Ok(rooted.to_string());
            }
            return Ok(mapped);
        }

        self.resolve_package(target).ok_or_else(|| Error::Css {
            path: importer.to_string(),
            message: format!("Could not resolve \"{target}\""),
        })
    }

    // Enough of node resolution for stylesheet packages: a direct file, or
    // the package.json `style`/`main` field when it names a stylesheet.
    fn resolve_package(&self, target: &str) -> Option<String> {
        let base = self.root.join("node_modules").join(target);
        if base.is_file() {
            return Some(format!("node_modules/{target}"));
        }

        let manifest = std::fs::read_to_string(base.join("package.json")).ok()?;
        let manifest: serde_json::Value = serde_json::from_str(&manifest).ok()?;
        for field in ["style", "main"] {
            if let Some(value) = manifest.get(field).and_then(|v| v.as_str()) {
                if value.ends_with(".css") && base.join(value).is_file() {
                    let joined: PathBuf =
                        Path::new("node_modules").join(target).join(value).clean();
                    return Some(joined.to_string_lossy().into_owned());
                }
            }
        }
        None
    }

    fn reprint(&self, css: &str, entry: &str) -> Result<String> {
        let targets = Targets { include: Features::Nesting, ..Targets::default() };
        let mut stylesheet = StyleSheet::parse(
            css,
            ParserOptions { filename: entry.to_string(), ..Default::default() },
        )
        .map_err(|e| Error::Css { path: entry.to_string(), message: format!("parse failed: {e}") })?;

        stylesheet
            .minify(MinifyOptions { targets, ..Default::default() })
            .map_err(|e| Error::Css {
                path: entry.to_string(),
                message: format!("minify failed: {e:?}"),
            })?;

        let printed = stylesheet
            .to_css(PrinterOptions { minify: true, targets, ..Default::default() })
            .map_err(|e| Error::Css {
                path: entry.to_string(),
                message: format!("print failed: {e:?}"),
            })?;
        Ok(printed.code)
    }
}

//! Translation of a [`BuildRequest`] into engine-ready configuration.
//!
//! Every knob the engine sees is derived here, up front, so a failed
//! translation never reaches the engine at all.

use std::path::PathBuf;

use rolldown_common::SourceMapType;

use crate::{
    Result,
    env::{EnvCache, EnvDefinitions, Environment},
    import_map::ImportMap,
    request::BuildRequest,
    specifier,
};

/// Directory under the application root that receives written bundles.
pub const OUTDIR: &str = "public/assets";

/// Naming template for entrypoint outputs of a code-split build.
pub const ENTRY_NAMES: &str = "[dir]/[name]$[hash]$";

/// Naming template for shared chunks of a code-split build.
pub const CHUNK_NAMES: &str = "_chunks/[name]-[hash]";

/// Import suffixes that are left as external references instead of being
/// pulled into the bundle. Fonts and raster images are served as-is, and
/// `.rjs` is the remote-script marker.
pub const EXTERNAL_EXTENSIONS: &[&str] =
    &[".rjs", ".gif", ".jpg", ".jpeg", ".png", ".woff2", ".woff"];

/// ESM-first package entry resolution. The usual default places `browser`
/// before `module`, but some packages ship a CJS `browser` build, and we
/// target browsers that speak ESM.
pub const MAIN_FIELDS: &[&str] = &["module", "browser", "main"];

/// Export-condition tag advertised to packages alongside the environment.
pub const CONDITION_TAG: &str = "stagehand";

/// How source maps are produced for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMapMode {
    /// No map is generated.
    None,
    /// Map written next to the output, referenced by a trailing comment.
    Linked,
    /// Map generated without a reference comment; the caller requested the
    /// map itself via a `.map` suffix.
    External,
}

impl SourceMapMode {
    pub(crate) fn engine_mode(self) -> Option<SourceMapType> {
        match self {
            SourceMapMode::None => None,
            SourceMapMode::Linked => Some(SourceMapType::File),
            SourceMapMode::External => Some(SourceMapType::Hidden),
        }
    }
}

/// The fully derived configuration for one engine invocation.
#[derive(Debug, Clone)]
pub struct ResolvedBuildConfig {
    pub entries: Vec<String>,
    pub root: PathBuf,
    pub base_url: String,
    pub import_map: ImportMap,

    /// Multi-entry builds are code-split and written to disk.
    pub splitting: bool,
    pub write: bool,

    pub outdir: PathBuf,
    /// Only set for written (multi-entry) builds.
    pub entry_names: Option<&'static str>,
    pub chunk_names: &'static str,

    pub sourcemap: SourceMapMode,
    pub minify: bool,
    pub jsx_dev: bool,
    pub debug: bool,

    pub externals: Vec<String>,
    pub conditions: Vec<String>,
    pub main_fields: Vec<String>,

    pub definitions: EnvDefinitions,
    pub metafile: bool,
}

impl ResolvedBuildConfig {
    /// Whether this request asked for a source map rather than its source.
    pub fn wants_map_only(&self) -> bool {
        self.sourcemap == SourceMapMode::External
    }
}

/// Derive the full build configuration from a request.
///
/// Import-map and env-var parse failures short-circuit here, before any
/// engine state is constructed.
pub fn translate(
    request: &BuildRequest,
    environment: Environment,
    env_cache: &EnvCache,
) -> Result<ResolvedBuildConfig> {
    let mut entries = request.entrypoints();
    let splitting = entries.len() > 1;

    let import_map = ImportMap::parse(
        request.import_map.as_deref(),
        request.import_map_path.as_deref(),
        &request.root,
    )?;

    let minify = !request.debug && environment == Environment::Production;

    let mut sourcemap = SourceMapMode::None;
    if splitting {
        sourcemap = SourceMapMode::Linked;
    } else if let Some(stripped) = request.path.strip_suffix(".map") {
        entries = vec![stripped.to_string()];
        sourcemap = SourceMapMode::External;
    }

    let single_path = entries.first().map(String::as_str).unwrap_or_default();
    let definitions = if !splitting
        && (specifier::is_url(single_path) || specifier::is_encoded_url(single_path))
    {
        // Remote modules only ever see the two sentinels; leaking the
        // application's env vars into third-party code is unwanted.
        EnvCache::sentinels(environment)
    } else {
        env_cache.resolve(environment, &request.env_vars)?
    };

    Ok(ResolvedBuildConfig {
        entries,
        root: request.root.clone(),
        base_url: request.base_url.clone(),
        import_map,
        splitting,
        write: splitting,
        outdir: request.root.join(OUTDIR),
        entry_names: splitting.then_some(ENTRY_NAMES),
        chunk_names: CHUNK_NAMES,
        sourcemap,
        minify,
        jsx_dev: environment != Environment::Test && environment != Environment::Production,
        debug: request.debug,
        externals: EXTERNAL_EXTENSIONS.iter().map(|ext| format!("*{ext}")).collect(),
        conditions: vec![environment.as_str().to_string(), CONDITION_TAG.to_string()],
        main_fields: MAIN_FIELDS.iter().map(|field| field.to_string()).collect(),
        definitions,
        metafile: request.metafile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{CachePolicy, ENV_OBJECT_SENTINEL, NODE_ENV_KEY};

    fn cache() -> EnvCache {
        EnvCache::new(CachePolicy::AlwaysRefresh)
    }

    fn request(path: &str) -> BuildRequest {
        BuildRequest::new(path, "/tmp/app")
    }

    #[test]
    fn single_entry_stays_in_memory_without_maps() {
        let config = translate(&request("lib/foo.js"), Environment::Test, &cache()).unwrap();
        assert_eq!(config.entries, vec!["lib/foo.js"]);
        assert!(!config.splitting);
        assert!(!config.write);
        assert_eq!(config.sourcemap, SourceMapMode::None);
        assert_eq!(config.entry_names, None);
    }

    #[test]
    fn multiple_entries_split_and_write_with_linked_maps() {
        let config =
            translate(&request("lib/foo.js;lib/bar.js"), Environment::Test, &cache()).unwrap();
        assert!(config.splitting);
        assert!(config.write);
        assert_eq!(config.sourcemap, SourceMapMode::Linked);
        assert_eq!(config.entry_names, Some("[dir]/[name]$[hash]$"));
        assert_eq!(config.chunk_names, "_chunks/[name]-[hash]");
        assert!(config.outdir.ends_with("public/assets"));
    }

    #[test]
    fn map_suffix_requests_the_map_of_the_stripped_entry() {
        let config = translate(&request("lib/foo.js.map"), Environment::Test, &cache()).unwrap();
        assert_eq!(config.entries, vec!["lib/foo.js"]);
        assert_eq!(config.sourcemap, SourceMapMode::External);
        assert!(config.wants_map_only());
    }

    #[test]
    fn minify_only_in_production_without_debug() {
        let prod = translate(&request("a.js"), Environment::Production, &cache()).unwrap();
        assert!(prod.minify);

        let debugged =
            translate(&request("a.js").debug(true), Environment::Production, &cache()).unwrap();
        assert!(!debugged.minify);

        let dev = translate(&request("a.js"), Environment::Development, &cache()).unwrap();
        assert!(!dev.minify);
    }

    #[test]
    fn jsx_dev_annotations_off_in_test_and_production() {
        assert!(translate(&request("a.jsx"), Environment::Development, &cache()).unwrap().jsx_dev);
        assert!(!translate(&request("a.jsx"), Environment::Test, &cache()).unwrap().jsx_dev);
        assert!(!translate(&request("a.jsx"), Environment::Production, &cache()).unwrap().jsx_dev);
    }

    #[test]
    fn url_requests_only_see_sentinel_definitions() {
        let req = request("https://cdn.example.test/foo.js").env_vars(r#"{"API_KEY":"abc"}"#);
        let config = translate(&req, Environment::Test, &cache()).unwrap();
        assert_eq!(config.definitions.len(), 2);
        assert_eq!(config.definitions[NODE_ENV_KEY], "'test'");
        assert_eq!(config.definitions[ENV_OBJECT_SENTINEL], "undefined");
    }

    #[test]
    fn encoded_url_requests_only_see_sentinel_definitions() {
        let encoded = crate::specifier::encode_url("https://cdn.example.test/foo.js");
        let config =
            translate(&request(&encoded).env_vars(r#"{"A":"1"}"#), Environment::Test, &cache())
                .unwrap();
        assert_eq!(config.definitions.len(), 2);
    }

    #[test]
    fn path_requests_see_namespaced_definitions() {
        let req = request("lib/foo.js").env_vars(r#"{"API_KEY":"abc"}"#);
        let config = translate(&req, Environment::Test, &cache()).unwrap();
        assert_eq!(config.definitions["stagehand.env.API_KEY"], "'abc'");
    }

    #[test]
    fn conditions_carry_environment_then_framework_tag() {
        let config = translate(&request("a.js"), Environment::Development, &cache()).unwrap();
        assert_eq!(config.conditions, vec!["development", "stagehand"]);
        assert_eq!(config.main_fields, vec!["module", "browser", "main"]);
    }

    #[test]
    fn fonts_and_remote_scripts_are_externalized() {
        let config = translate(&request("a.js"), Environment::Test, &cache()).unwrap();
        assert!(config.externals.contains(&"*.woff2".to_string()));
        assert!(config.externals.contains(&"*.rjs".to_string()));
    }
}

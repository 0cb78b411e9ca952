//! The build pipeline: translate a request, run the engine, shape output.

use std::path::Path;
use std::sync::Arc;

use rolldown::{
    BundleOutput, BundlerBuilder, BundlerOptions, InputItem, IsExternal, Platform,
    RawMinifyOptions, ResolveOptions,
};
use rolldown_common::{BundlerTransformOptions, Either, JsxOptions, OutputFormat};
use tracing::debug;

use crate::{
    Error, Result,
    config::{self, ResolvedBuildConfig, SourceMapMode},
    css::bundler::CssBundler,
    diagnostics::{self, Diagnostic},
    env::{CachePolicy, EnvCache, Environment},
    output,
    plugins,
    remote::{NoRemoteLoader, RemoteLoader},
    request::BuildRequest,
    specifier,
};

/// A single produced file. `path` is relative to the output directory for
/// written builds, or the request path for in-memory builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// The result of one build.
///
/// `diagnostics` must be checked before trusting `outputs`; a failed
/// resolution yields diagnostics rather than an `Err`.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub outputs: Vec<OutputFile>,
    /// Whether outputs were also written under `public/assets`.
    pub written: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn failure(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics, ..Default::default() }
    }
}

/// Orchestrates builds for one application environment.
///
/// The pipeline owns the cross-request environment-definition cache; build
/// requests themselves are immutable.
#[derive(Debug)]
pub struct Pipeline {
    environment: Environment,
    env_cache: EnvCache,
    remote: Arc<dyn RemoteLoader>,
}

impl Pipeline {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            env_cache: EnvCache::new(CachePolicy::for_environment(environment)),
            remote: Arc::new(NoRemoteLoader),
        }
    }

    /// Override the cache policy derived from the environment.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.env_cache = EnvCache::new(policy);
        self
    }

    /// Install a loader for remote mixin sources.
    pub fn with_remote_loader(mut self, remote: Arc<dyn RemoteLoader>) -> Self {
        self.remote = remote;
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Run one build.
    ///
    /// Parse-phase failures (import map, env vars) and resolution failures
    /// come back as the outcome's diagnostics; infrastructure failures (I/O,
    /// writes) are `Err`.
    pub async fn build(&self, request: BuildRequest) -> Result<BuildOutcome> {
        debug!(path = %request.path, root = %request.root.display(), "starting build");

        let config = match config::translate(&request, self.environment, &self.env_cache) {
            Ok(config) => config,
            Err(Error::ImportMapParse(detail)) => {
                return Ok(BuildOutcome::failure(vec![Diagnostic::with_detail(
                    "Failed to parse import map",
                    detail,
                )]));
            }
            Err(Error::EnvJsonParse(detail)) => {
                return Ok(BuildOutcome::failure(vec![Diagnostic::with_detail(
                    "Failed to parse environment variables",
                    detail,
                )]));
            }
            Err(other) => return Err(other),
        };

        if config.debug {
            debug!(?config, "resolved build configuration");
        }

        if let Some(diagnostics) = self.missing_entrypoints(&config) {
            return Ok(BuildOutcome::failure(diagnostics));
        }

        let (css_entries, script_entries): (Vec<String>, Vec<String>) = config
            .entries
            .iter()
            .cloned()
            .partition(|entry| entry.ends_with(".css"));

        let mut outcome = BuildOutcome::default();

        for entry in &css_entries {
            match self.build_stylesheet(entry, &config) {
                Ok(file) => outcome.outputs.push(file),
                Err(Error::Css { message, .. }) => {
                    return Ok(BuildOutcome::failure(vec![Diagnostic::new(message)]));
                }
                Err(other) => return Err(other),
            }
        }

        if !script_entries.is_empty() {
            match self.run_engine(&script_entries, &config).await {
                Ok(bundle) => {
                    if config.metafile {
                        self.write_metafile(&bundle, &config)?;
                    }
                    self.collect_outputs(&bundle, &config, &mut outcome)?;
                }
                Err(Error::Engine(diagnostics)) => {
                    return Ok(BuildOutcome::failure(diagnostics));
                }
                Err(other) => return Err(other),
            }
        }

        if config.write {
            output::write_files(&outcome.outputs, &config.outdir)?;
            outcome.written = true;
        }

        debug!(outputs = outcome.outputs.len(), written = outcome.written, "build finished");
        Ok(outcome)
    }

    fn missing_entrypoints(&self, config: &ResolvedBuildConfig) -> Option<Vec<Diagnostic>> {
        let missing: Vec<Diagnostic> = config
            .entries
            .iter()
            .filter(|entry| {
                !specifier::is_url(entry)
                    && !specifier::is_encoded_url(entry)
                    && !config.root.join(entry).is_file()
            })
            .map(|entry| Diagnostic::could_not_resolve(entry))
            .collect();

        (!missing.is_empty()).then_some(missing)
    }

    fn build_stylesheet(&self, entry: &str, config: &ResolvedBuildConfig) -> Result<OutputFile> {
        let css = CssBundler::new(
            &config.root,
            &config.base_url,
            &config.import_map,
            self.remote.as_ref(),
            config.minify,
        )
        .bundle(entry)?;

        let path = if config.splitting {
            let rel = Path::new(entry);
            let dir = rel.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            let name = rel
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "entry".to_string());
            let hash = crate::short_digest(css.as_bytes());
            let template = config.entry_names.unwrap_or(config::ENTRY_NAMES);
            output::apply_template(template, &dir, &name, &hash, "css")
        } else {
            entry.to_string()
        };

        Ok(OutputFile { path, contents: css.into_bytes() })
    }

    async fn run_engine(
        &self,
        entries: &[String],
        config: &ResolvedBuildConfig,
    ) -> Result<BundleOutput> {
        let options = engine_options(entries, config);
        let chain = plugins::compose_chain(config, Arc::clone(&self.remote));

        let mut bundler = BundlerBuilder::default()
            .with_options(options)
            .with_plugins(chain)
            .build()
            .map_err(|e| Error::Engine(diagnostics::from_engine_error(&e)))?;

        bundler
            .generate()
            .await
            .map_err(|e| Error::Engine(diagnostics::from_engine_error(&e)))
    }

    fn collect_outputs(
        &self,
        bundle: &BundleOutput,
        config: &ResolvedBuildConfig,
        outcome: &mut BuildOutcome,
    ) -> Result<()> {
        let collected = output::collect(bundle);

        if config.wants_map_only() {
            let chunk = collected
                .chunks
                .iter()
                .find(|chunk| chunk.is_entry)
                .ok_or_else(|| Error::InvalidConfig("engine produced no entry chunk".to_string()))?;
            let map_json = chunk
                .map_json
                .clone()
                .or_else(|| {
                    // Some sourcemap modes emit the map as a sibling asset
                    // instead of attaching it to the chunk.
                    let sibling = format!("{}.map", chunk.filename);
                    collected
                        .assets
                        .iter()
                        .find(|asset| asset.path == sibling)
                        .map(|asset| String::from_utf8_lossy(&asset.contents).into_owned())
                })
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "no source map was produced for {}",
                        chunk.filename
                    ))
                })?;

            outcome.outputs.push(OutputFile {
                path: format!("{}.map", chunk.filename),
                contents: map_json.into_bytes(),
            });
            return Ok(());
        }

        if !config.splitting {
            for chunk in &collected.chunks {
                outcome
                    .outputs
                    .push(OutputFile { path: chunk.filename.clone(), contents: chunk.code.clone().into_bytes() });
            }
            outcome.outputs.extend(collected.assets);
            return Ok(());
        }

        let entry_template = config.entry_names.unwrap_or(config::ENTRY_NAMES);
        let renames =
            output::plan_renames(&collected.chunks, &config.root, entry_template, config.chunk_names);

        for chunk in &collected.chunks {
            let renamed = renames
                .get(&chunk.filename)
                .cloned()
                .unwrap_or_else(|| chunk.filename.clone());
            let mut code = output::rewrite_references(&chunk.code, &renames, &renamed);

            if let Some(map_json) = &chunk.map_json {
                if config.sourcemap == SourceMapMode::Linked {
                    let map_path = format!("{renamed}.map");
                    let map_basename = Path::new(&map_path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| map_path.clone());
                    code = output::patch_sourcemap_reference(&code, &map_basename);
                    outcome.outputs.push(OutputFile {
                        path: map_path,
                        contents: map_json.clone().into_bytes(),
                    });
                }
            }

            outcome.outputs.push(OutputFile { path: renamed, contents: code.into_bytes() });
        }

        // Maps are synthesized from chunk data above under their renamed
        // paths; engine-emitted map assets would carry stale names.
        outcome
            .outputs
            .extend(collected.assets.into_iter().filter(|asset| !asset.path.ends_with(".map")));
        Ok(())
    }

    fn write_metafile(&self, bundle: &BundleOutput, config: &ResolvedBuildConfig) -> Result<()> {
        let collected = output::collect(bundle);
        let mut outputs = serde_json::Map::new();
        for chunk in &collected.chunks {
            outputs.insert(
                chunk.filename.clone(),
                serde_json::json!({
                    "bytes": chunk.code.len(),
                    "isEntry": chunk.is_entry,
                    "facade": chunk.facade,
                }),
            );
        }
        for asset in &collected.assets {
            outputs.insert(
                asset.path.clone(),
                serde_json::json!({ "bytes": asset.contents.len(), "isEntry": false }),
            );
        }

        let metafile = serde_json::Value::Object(
            [("outputs".to_string(), serde_json::Value::Object(outputs))].into_iter().collect(),
        );
        let path = config.root.join("meta.json");
        std::fs::write(&path, metafile.to_string()).map_err(|e| {
            Error::WriteFailure(format!("Failed to write metafile '{}': {e}", path.display()))
        })
    }
}

fn engine_options(entries: &[String], config: &ResolvedBuildConfig) -> BundlerOptions {
    let externals: Vec<String> = config
        .externals
        .iter()
        .map(|glob| format!("{}$", regex::escape(glob.trim_start_matches('*'))))
        .collect();

    let node_modules = config.root.join("node_modules").to_string_lossy().into_owned();

    BundlerOptions {
        input: Some(
            entries
                .iter()
                .map(|entry| InputItem { name: None, import: entry.clone() })
                .collect(),
        ),
        cwd: Some(config.root.clone()),
        format: Some(OutputFormat::Esm),
        platform: Some(Platform::Browser),
        sourcemap: config.sourcemap.engine_mode(),
        minify: config.minify.then(|| RawMinifyOptions::from(true)),
        transform: Some(BundlerTransformOptions {
            jsx: Some(Either::Right(JsxOptions {
                runtime: Some("automatic".to_string()),
                development: Some(config.jsx_dev),
                ..Default::default()
            })),
            ..Default::default()
        }),
        external: Some(IsExternal::from(externals)),
        resolve: Some(ResolveOptions {
            main_fields: Some(config.main_fields.clone()),
            condition_names: Some(config.conditions.clone()),
            extensions: Some(
                [".js", ".mjs", ".json", ".jsx", ".ts", ".tsx"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            modules: Some(vec![node_modules, "node_modules".to_string()]),
            symlinks: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

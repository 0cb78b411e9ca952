//! # stagehand-bundler
//!
//! Asset-build orchestrator on top of the Rolldown bundling engine.
//!
//! Stagehand turns an entrypoint request plus runtime context (environment,
//! import map, base URL) into a fully-specified bundling job, and extends the
//! engine with framework conventions: import maps, environment-variable
//! injection, CSS Modules scoping/injection, and remote/URL-based modules.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stagehand_bundler::{BuildRequest, Environment, Pipeline};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(Environment::Development);
//!
//! let outcome = pipeline
//!     .build(BuildRequest::new("lib/app.js", "/path/to/project"))
//!     .await?;
//!
//! if outcome.is_success() {
//!     for file in &outcome.outputs {
//!         println!("{} ({} bytes)", file.path, file.contents.len());
//!     }
//! }
//! # Ok(()) }
//! ```
//!
//! The visible surface is deliberately small: [`Pipeline::build`] takes an
//! immutable [`BuildRequest`] and returns a [`BuildOutcome`] whose
//! `diagnostics` list must be checked before trusting `outputs`.

pub mod build;
pub mod config;
pub mod css;
pub mod diagnostics;
pub mod env;
pub mod import_map;
pub mod output;
pub mod plugins;
pub mod remote;
pub mod request;
pub mod specifier;

mod digest;

// Re-export core Rolldown types for plugin authors
pub use rolldown::{Bundler, BundlerBuilder, BundlerOptions, OutputFormat, SourceMapType};
pub use rolldown_common::{ModuleType, Output, OutputAsset, OutputChunk, ResolvedExternal};
pub use rolldown_plugin::{
    __inner::SharedPluginable, HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs,
    HookResolveIdOutput, HookResolveIdReturn, HookTransformArgs, HookTransformOutput,
    HookTransformReturn, HookUsage, Plugin, PluginContext, SharedTransformPluginContext,
};

pub use build::{BuildOutcome, OutputFile, Pipeline};
pub use config::{ResolvedBuildConfig, SourceMapMode};
pub use css::modules::{ClassNameMap, CssModuleDigest};
pub use diagnostics::Diagnostic;
pub use env::{CachePolicy, EnvCache, EnvDefinitions, Environment};
pub use import_map::ImportMap;
pub use remote::{NoRemoteLoader, RemoteLoader};
pub use request::BuildRequest;
pub use specifier::Specifier;

pub(crate) use digest::short_digest;

/// Error types for stagehand-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The import map could not be parsed. Aborts the request before any
    /// engine work is attempted.
    #[error("Failed to parse import map: {0}")]
    ImportMapParse(String),

    /// The environment-variables JSON blob could not be parsed.
    #[error("Failed to parse environment variables: {0}")]
    EnvJsonParse(String),

    /// Invalid request or derived configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the bundling engine, as structured diagnostics.
    #[error("Engine error: {}", diagnostics::format_diagnostics(.0))]
    Engine(Vec<Diagnostic>),

    /// CSS parsing or printing failed.
    #[error("CSS error in {path}: {message}")]
    Css { path: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File write operation failed (split output or metafile).
    #[error("Write failure: {0}")]
    WriteFailure(String),
}

/// Result type alias for stagehand-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::ImportMapParse(_) => "IMPORT_MAP_PARSE",
            Error::EnvJsonParse(_) => "ENV_JSON_PARSE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Engine(_) => "ENGINE_ERROR",
            Error::Css { .. } => "CSS_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::WriteFailure(_) => "WRITE_FAILURE",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::ImportMapParse(detail) => Some(Box::new(format!(
                "Check the import map document for JSON syntax errors.\nDetail: {detail}"
            ))),
            Error::EnvJsonParse(detail) => Some(Box::new(format!(
                "Environment variables must be a flat JSON object of strings.\nDetail: {detail}"
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {msg}"
            ))),
            _ => None,
        }
    }
}

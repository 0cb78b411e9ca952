//! The inbound build request.

use std::path::{Path, PathBuf};

/// A single build request, immutable once handed to
/// [`Pipeline::build`](crate::Pipeline::build).
///
/// # Examples
///
/// ```no_run
/// use stagehand_bundler::BuildRequest;
///
/// let request = BuildRequest::new("lib/app.js;lib/admin.js", "/srv/app")
///     .base_url("https://example.com")
///     .import_map_path("config/import_map.json")
///     .env_vars(r#"{"API_KEY":"abc"}"#)
///     .metafile(true);
/// ```
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Path(s) to build relative to `root`. Multiple paths are separated by
    /// a semi-colon.
    pub path: String,

    /// The working directory, usually the application root.
    pub root: PathBuf,

    /// Base URL of the application, e.g. `https://example.com`.
    pub base_url: String,

    /// Inline import map contents. Wins over `import_map_path`.
    pub import_map: Option<Vec<u8>>,

    /// Path to an import map (JSON), relative to `root`.
    pub import_map_path: Option<String>,

    /// Environment variables as a JSON string.
    pub env_vars: String,

    /// Disable minification and raise engine log verbosity.
    pub debug: bool,

    /// Write the engine's build-graph metadata to `<root>/meta.json`.
    pub metafile: bool,
}

impl BuildRequest {
    pub fn new(path: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            path: path.into(),
            root: root.as_ref().to_path_buf(),
            base_url: String::new(),
            import_map: None,
            import_map_path: None,
            env_vars: String::new(),
            debug: false,
            metafile: false,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn import_map(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.import_map = Some(contents.into());
        self
    }

    pub fn import_map_path(mut self, path: impl Into<String>) -> Self {
        self.import_map_path = Some(path.into());
        self
    }

    pub fn env_vars(mut self, env_vars: impl Into<String>) -> Self {
        self.env_vars = env_vars.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn metafile(mut self, metafile: bool) -> Self {
        self.metafile = metafile;
        self
    }

    /// Ordered entrypoint list, split on `;` with empty segments dropped.
    pub fn entrypoints(&self) -> Vec<String> {
        self.path
            .split(';')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }
}

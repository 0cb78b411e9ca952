//! Environment names and the environment-definition cache.
//!
//! Builds substitute symbolic constants (`stagehand.env.*`,
//! `process.env.NODE_ENV`) with literal values at bundle time. The mapping is
//! derived once from a JSON blob supplied with the first build and then
//! memoized for the life of the process; the test environment recomputes on
//! every call so assertions see fresh values.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Well-known runtime environments, mirroring the host framework's notion of
/// `RAILS_ENV` / `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" => Ok(Environment::Production),
            other => Err(Error::InvalidConfig(format!(
                "Unknown environment: '{other}'. Expected: development, test, production"
            ))),
        }
    }
}

/// Mapping from symbolic constant name to a literal replacement value.
///
/// Values are already quoted for direct substitution into JavaScript source
/// (e.g. `'abc'`), except the `stagehand.env` sentinel which carries the bare
/// literal `undefined`.
pub type EnvDefinitions = FxHashMap<String, String>;

/// Namespace prefix for user-supplied environment keys.
pub const ENV_NAMESPACE: &str = "stagehand.env.";

/// Sentinel key signalling that no structured runtime environment object is
/// available to downstream code.
pub const ENV_OBJECT_SENTINEL: &str = "stagehand.env";

/// Plain process-environment mirror key.
pub const NODE_ENV_KEY: &str = "process.env.NODE_ENV";

/// When a cached definition map may be reused across builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Compute once, reuse for every later build.
    Memoize,
    /// Recompute on every call. Used by the test environment so repeated
    /// builds observe the blob they were given.
    AlwaysRefresh,
}

impl CachePolicy {
    /// Default policy for an environment: tests refresh, everything else
    /// memoizes.
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Test => CachePolicy::AlwaysRefresh,
            _ => CachePolicy::Memoize,
        }
    }
}

/// Thread-safe cache of environment definitions shared across concurrent
/// build requests.
#[derive(Debug)]
pub struct EnvCache {
    policy: CachePolicy,
    cached: Mutex<Option<EnvDefinitions>>,
}

impl EnvCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            cached: Mutex::new(None),
        }
    }

    /// Resolve the definition map for `env_vars`, a JSON blob of flat
    /// string-to-string pairs (may be empty).
    ///
    /// Guarantees regardless of input:
    /// - `process.env.NODE_ENV` is always defined;
    /// - the `stagehand.env` sentinel is always the literal `undefined`.
    ///
    /// Malformed JSON propagates as [`Error::EnvJsonParse`] without touching
    /// the cache.
    pub fn resolve(&self, env: Environment, env_vars: &str) -> Result<EnvDefinitions> {
        if self.policy == CachePolicy::Memoize {
            if let Some(cached) = self.cached.lock().as_ref() {
                return Ok(cached.clone());
            }
        }

        let definitions = compute_definitions(env, env_vars)?;
        *self.cached.lock() = Some(definitions.clone());
        Ok(definitions)
    }

    /// The two sentinel definitions, used for URL-like requests where custom
    /// environment keys must not leak into remote modules.
    pub fn sentinels(env: Environment) -> EnvDefinitions {
        let mut map = EnvDefinitions::default();
        map.insert(NODE_ENV_KEY.to_string(), format!("'{env}'"));
        map.insert(ENV_OBJECT_SENTINEL.to_string(), "undefined".to_string());
        map
    }
}

fn compute_definitions(env: Environment, env_vars: &str) -> Result<EnvDefinitions> {
    let mut map = EnvDefinitions::default();

    // RAILS_ENV and NODE_ENV are always defined; custom vars overlay them.
    let quoted = format!("'{env}'");
    map.insert(format!("{ENV_NAMESPACE}RAILS_ENV"), quoted.clone());
    map.insert(format!("{ENV_NAMESPACE}NODE_ENV"), quoted);

    if !env_vars.is_empty() {
        let vars: FxHashMap<String, String> = serde_json::from_str(env_vars)
            .map_err(|e| Error::EnvJsonParse(e.to_string()))?;

        for (key, value) in vars {
            if !key.is_empty() || !value.is_empty() {
                map.insert(format!("{ENV_NAMESPACE}{key}"), format!("'{value}'"));
            }
        }
    }

    let mirror = map
        .get(&format!("{ENV_NAMESPACE}RAILS_ENV"))
        .cloned()
        .unwrap_or_else(|| format!("'{env}'"));
    map.insert(NODE_ENV_KEY.to_string(), mirror);
    map.insert(ENV_OBJECT_SENTINEL.to_string(), "undefined".to_string());

    Ok(map)
}

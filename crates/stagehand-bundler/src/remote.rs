//! Remote module fetching seam.
//!
//! Fetch mechanics for remote modules are owned by the caller; the bundler
//! only defines the capability. The default implementation declines every
//! URL, which keeps remote modules externalized (the runtime resolves them as
//! encoded absolute requests instead).

use std::fmt::Debug;

/// Capability to fetch a remote module's source at build time.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// from concurrent builds.
pub trait RemoteLoader: Debug + Send + Sync {
    /// Fetch the source for `url`, or `None` to decline (the module stays
    /// external).
    fn fetch(&self, url: &str) -> Option<String>;
}

/// Default loader: declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemoteLoader;

impl RemoteLoader for NoRemoteLoader {
    fn fetch(&self, _url: &str) -> Option<String> {
        None
    }
}

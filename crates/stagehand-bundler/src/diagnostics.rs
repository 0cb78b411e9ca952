//! Structured diagnostics extracted from engine and parse failures.
//!
//! The engine's error types are not stable across versions, so we reduce
//! everything to a cloneable, serializable shape and parse the formatted
//! messages when structure is unavailable.

use serde::{Deserialize, Serialize};

/// A single build failure, suitable for returning to a caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Short, stable message, e.g. `Could not resolve "unknown.js"`.
    pub text: String,

    /// Additional detail (importer, location, underlying cause). Empty when
    /// nothing useful is known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl Diagnostic {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), detail: String::new() }
    }

    pub fn with_detail(text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { text: text.into(), detail: detail.into() }
    }

    /// The diagnostic emitted when an entrypoint or import does not resolve.
    pub fn could_not_resolve(specifier: &str) -> Self {
        Self::new(format!("Could not resolve \"{specifier}\""))
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{} ({})", self.text, self.detail)
        }
    }
}

/// Join diagnostics into a single human-readable line, newest first order
/// preserved.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Reduce an engine error to diagnostics.
///
/// Engine errors arrive as opaque batched values. We extract the resolution
/// failures we can recognise and fall back to the formatted message for the
/// rest.
pub fn from_engine_error(error: &dyn std::fmt::Debug) -> Vec<Diagnostic> {
    let formatted = format!("{error:?}");
    let mut out = Vec::new();

    // Resolution failures are the common case and callers match on the
    // message text, so normalise them.
    for specifier in unresolved_specifiers(&formatted) {
        out.push(Diagnostic::could_not_resolve(&specifier));
    }

    if out.is_empty() {
        out.push(Diagnostic::with_detail("Build failed", first_line(&formatted)));
    }

    out
}

fn unresolved_specifiers(formatted: &str) -> Vec<String> {
    let mut specifiers = Vec::new();
    for marker in ["Could not resolve", "Cannot resolve", "UNRESOLVED_IMPORT"] {
        let mut rest = formatted;
        while let Some(pos) = rest.find(marker) {
            rest = &rest[pos + marker.len()..];
            if let Some(specifier) = quoted_string(rest) {
                if !specifiers.contains(&specifier) {
                    specifiers.push(specifier);
                }
            }
        }
    }
    specifiers
}

fn quoted_string(text: &str) -> Option<String> {
    for quote in ['"', '\'', '`'] {
        if let Some(start) = text.find(quote) {
            // Only accept a quote near the marker, otherwise we pick up
            // unrelated strings later in the message.
            if start > 8 {
                continue;
            }
            let after = &text[start + 1..];
            if let Some(end) = after.find(quote) {
                return Some(after[..end].to_string());
            }
        }
    }
    None
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

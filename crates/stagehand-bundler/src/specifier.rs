//! Module specifier classification.
//!
//! Every specifier flowing through resolution is classified into one of five
//! shapes; the classification drives externalization and rewriting policy.
//! Remote URLs are never fetched at this layer. They are rewritten to an
//! absolute, percent-encoded path (`/https%3A%2F%2F...`) so the runtime can
//! request them as ordinary absolute scripts handled by the serving layer.

/// Classification of a module specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier {
    /// `./foo.js` or `../foo.js`, resolved against the importer.
    Relative,
    /// `/lib/foo.js`, rooted at the project root.
    Absolute,
    /// `react`, `lodash/merge` - resolved via import map or node_modules.
    Bare,
    /// `https://example.com/foo.js`.
    Url,
    /// `/https%3A%2F%2Fexample.com%2Ffoo.js` - a previously encoded remote
    /// reference flowing back through resolution.
    EncodedUrl,
}

impl Specifier {
    pub fn classify(specifier: &str) -> Specifier {
        if is_url(specifier) {
            Specifier::Url
        } else if is_encoded_url(specifier) {
            Specifier::EncodedUrl
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            Specifier::Relative
        } else if specifier.starts_with('/') {
            Specifier::Absolute
        } else {
            Specifier::Bare
        }
    }
}

/// True for `http://` and `https://` specifiers.
pub fn is_url(specifier: &str) -> bool {
    specifier.starts_with("https://") || specifier.starts_with("http://")
}

/// True for percent-encoded remote references, with or without the leading
/// slash the runtime uses to request them.
pub fn is_encoded_url(specifier: &str) -> bool {
    let candidate = specifier.strip_prefix('/').unwrap_or(specifier);
    candidate.starts_with("https%3A%2F%2F") || candidate.starts_with("http%3A%2F%2F")
}

/// Rewrite a remote URL to its absolute, percent-encoded path form.
pub fn encode_url(url: &str) -> String {
    format!("/{}", urlencoding::encode(url))
}

/// Recover the original URL from an encoded remote reference.
pub fn decode_url(specifier: &str) -> Option<String> {
    if !is_encoded_url(specifier) {
        return None;
    }
    let candidate = specifier.strip_prefix('/').unwrap_or(specifier);
    urlencoding::decode(candidate).ok().map(|s| s.into_owned())
}

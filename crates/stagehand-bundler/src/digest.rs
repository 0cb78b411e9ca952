use sha2::{Digest, Sha256};

/// Truncated hex fingerprint used for CSS Modules scoping and output naming.
///
/// Eight hex characters (32 bits) keeps generated class names readable while
/// making accidental collisions across a project's stylesheets negligible.
pub(crate) fn short_digest(input: &[u8]) -> String {
    let hash = Sha256::digest(input);
    let mut out = String::with_capacity(8);
    for byte in &hash[..4] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// One-way digest for long-lived secrets.
///
/// Refresh-session secrets are stored only as their SHA-256 digest, so a
/// database leak does not leak usable credentials. Pure function: same
/// input, same 64-character lowercase hex output, regardless of input size.

use sha2::{Digest, Sha256};

pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

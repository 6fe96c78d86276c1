use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 of extracted resume text, hex encoded. The assessment cache key.
///
/// Exact-match on purpose: no trimming, no case folding. Two resumes that differ
/// by a single character get different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// Callers must reject empty text before hashing.
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        ContentKey(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

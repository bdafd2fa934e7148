//! Deterministic identifier source.
//!
//! Placeholder candidates and generated (synthetic-provider) images need ids
//! and mock URLs. They are derived by hashing a seed with the inputs that
//! identify the item, so the same request always produces the same ids and
//! tests can assert exact outputs.
//!
//! ```text
//! sha256(seed \0 namespace \0 part₁ \0 part₂ ...)  →  "{namespace}-{first 12 hex}"
//! ```
//!
//! Production code that wants variation swaps in a different seed or its own
//! [`IdSource`] implementation.

use sha2::{Digest, Sha256};

/// Number of hex characters kept in derived ids.
const ID_HEX_LEN: usize = 12;

pub trait IdSource: Send + Sync {
    /// 32 bytes derived from `namespace` and `parts`.
    fn digest(&self, namespace: &str, parts: &[&str]) -> [u8; 32];

    /// Short id of the form `{namespace}-{hex}`.
    fn derive_id(&self, namespace: &str, parts: &[&str]) -> String {
        let digest = self.digest(namespace, parts);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}-{}", namespace, &hex[..ID_HEX_LEN])
    }
}

/// SHA-256 keyed by a fixed seed string.
#[derive(Debug, Clone)]
pub struct SeededIds {
    seed: String,
}

impl SeededIds {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }
}

impl IdSource for SeededIds {
    fn digest(&self, namespace: &str, parts: &[&str]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(b"\0");
        hasher.update(namespace.as_bytes());
        for part in parts {
            hasher.update(b"\0");
            hasher.update(part.as_bytes());
        }
        hasher.finalize().into()
    }
}

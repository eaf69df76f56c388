use crate::evidence::memory_hash;
use crate::sealing::{ArtifactSealer, SealError};

/// Mock sealer for testing.
///
/// Signatures are a deterministic fingerprint of the artifact bytes, so
/// `verify` genuinely fails when the artifact changed after signing.
pub struct MockSealer {
    reject: bool,
}

impl MockSealer {
    /// A sealer that signs everything.
    pub fn new() -> Self {
        Self { reject: false }
    }

    /// A sealer that rejects every signing request.
    pub fn rejecting() -> Self {
        Self { reject: true }
    }
}

impl Default for MockSealer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactSealer for MockSealer {
    fn sign(&self, artifact: &[u8]) -> Result<String, SealError> {
        if self.reject {
            return Err(SealError::Rejected("mock sealer: rejected".into()));
        }
        Ok(format!("sealed:{:016x}", memory_hash(artifact)))
    }

    fn verify(&self, artifact: &[u8], signature: &str) -> bool {
        signature == format!("sealed:{:016x}", memory_hash(artifact))
    }
}

use thiserror::Error;

/// Errors from the external sealing collaborator.
#[derive(Error, Debug)]
pub enum SealError {
    #[error("signing rejected by sealer: {0}")]
    Rejected(String),

    #[error("sealer unavailable: {0}")]
    Unavailable(String),
}

/// External cryptographic sealing capability.
///
/// The governance engine calls this to populate and check a token's stage
/// signature. Key handling and signing math live entirely behind this trait;
/// nothing in this crate implements cryptography.
pub trait ArtifactSealer: Send + Sync {
    /// Produce a signature string over the artifact bytes.
    fn sign(&self, artifact: &[u8]) -> Result<String, SealError>;

    /// Check a signature string against the artifact bytes.
    fn verify(&self, artifact: &[u8], signature: &str) -> bool;
}

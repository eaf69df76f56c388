use thiserror::Error;

use crate::sealing::SealError;

/// Structural errors from the governance engine.
///
/// These are the fail-fast cases: invalid arguments and impossible requests.
/// Validation and policy failures are NOT errors — they are recorded as
/// [`crate::GovernanceViolation`]s and reported as boolean/decision outcomes
/// the caller must act on.
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("invalid governance contract: {0}")]
    InvalidContract(String),

    #[error("stage level {0} is not on the governance ladder (0, 1, 3, 4, 5)")]
    InvalidStageLevel(u32),

    #[error("allocation of {requested} bytes exceeds contract ceiling of {limit}")]
    AllocationExceedsContract { requested: usize, limit: usize },

    #[error("token {0} is not registered with this engine")]
    TokenNotRegistered(u64),

    #[error("engine is shut down; no further governance operations accepted")]
    EngineInactive,

    #[error("no artifact sealer configured")]
    SealerUnavailable,

    #[error("sealing failed: {0}")]
    Seal(#[from] SealError),

    #[error("contract parse error: {0}")]
    ContractParse(#[from] serde_json::Error),
}

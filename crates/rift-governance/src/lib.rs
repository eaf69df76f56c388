//! Stage-gated memory governance for the RIFT compiler pipeline.
//!
//! Every artifact the pipeline produces (tokens, parse trees, bytecode) is
//! wrapped in a [`MemoryToken`]: a governed handle over the artifact's byte
//! region plus the evidence collected about it. The engine evaluates that
//! evidence against a [`GovernanceContract`] and enforces a forward-only
//! stage ladder with an explicit, auditable override path.
//!
//! ## The governance ladder
//!
//! | stage | name | gate |
//! |---|---|---|
//! | 0 | basic_optional | non-empty governed region |
//! | 1 | sealed_signature | stage signature present, memory hash present |
//! | 3 | obfuscated_minimized_entropy_aware | entropy within tolerance, checksum intact, entropy above contract threshold |
//! | 4 | hardened_encrypted_context_validated | stage-3 evidence re-run, governance flags set, encryption flag set |
//! | 5 | fully_sealed_anti_reversion | stage-4 evidence re-run, anti-reversion lock active, entropy ≥ 6.0 bits/byte |
//!
//! Stage 2 (semantic analysis) is deliberately absent from this ladder; the
//! legal edges are contract data, so a stage-2 gate can be added without
//! touching the transition machinery.
//!
//! ## Invariants
//!
//! - A token's stage level only increases, unless an override is recorded.
//!   Every permitted downgrade is attributable to an explicit, logged
//!   authority decision — never silent.
//! - The context checksum must equal the recomputed value at every
//!   verification; a mismatch is always a hard failure, never corrected.
//! - Higher stages re-run the evidence checks of every lower stage. Tokens
//!   are long-lived handles over memory the pipeline mutates between
//!   verifications; nothing since the last check is trusted.
//! - The violation log and audit log are append-only; every validation
//!   attempt, pass or fail, is observable.
//!
//! Cryptographic sealing is external: the engine calls an [`ArtifactSealer`]
//! to populate stage signatures and never implements signing math itself.

pub mod audit;
pub mod contract;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod mocks;
pub mod sealing;
pub mod token;
pub mod transition;
pub mod verifier;
pub mod violation;

pub use audit::{AuditEvent, AuditLog, AuditRecord};
pub use contract::{transitions, GovernanceContract, GovernanceContractBuilder};
pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use evidence::{context_checksum, memory_hash, shannon_entropy};
pub use mocks::MockSealer;
pub use sealing::{ArtifactSealer, SealError};
pub use token::{flags, MemoryToken, StageLevel};
pub use transition::{evaluate_transition, TransitionDecision};
pub use verifier::{verify, StageFailure};
pub use violation::{GovernanceViolation, ViolationFilter, ViolationKind, ViolationLog};

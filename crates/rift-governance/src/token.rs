use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Governance policy flags carried by a [`MemoryToken`].
pub mod flags {
    /// Encryption has been applied to the governed region. Required from
    /// stage 4 onward.
    pub const ENCRYPTED: u32 = 0x40;
}

/// Assurance tier of a governed artifact.
///
/// The ladder runs 0 → 1 → 3 → 4 → 5. Stage 2 (semantic analysis) is
/// governed by a different mechanism and has no tier here; constructing a
/// `StageLevel` from `2` is an error, not a silent mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageLevel {
    /// Stage 0 — basic_optional.
    Basic,
    /// Stage 1 — sealed_signature.
    Sealed,
    /// Stage 3 — obfuscated_minimized_entropy_aware.
    Minimized,
    /// Stage 4 — hardened_encrypted_context_validated.
    Hardened,
    /// Stage 5 — fully_sealed_anti_reversion. Terminal.
    FullySealed,
}

impl StageLevel {
    /// Numeric stage level as the pipeline names it (0, 1, 3, 4, 5).
    pub fn level(self) -> u32 {
        match self {
            StageLevel::Basic => 0,
            StageLevel::Sealed => 1,
            StageLevel::Minimized => 3,
            StageLevel::Hardened => 4,
            StageLevel::FullySealed => 5,
        }
    }

    /// Gate name used in diagnostics and audit records.
    pub fn gate_name(self) -> &'static str {
        match self {
            StageLevel::Basic => "basic_optional",
            StageLevel::Sealed => "sealed_signature",
            StageLevel::Minimized => "obfuscated_minimized_entropy_aware",
            StageLevel::Hardened => "hardened_encrypted_context_validated",
            StageLevel::FullySealed => "fully_sealed_anti_reversion",
        }
    }

    /// The single legal forward successor, if any. Stage 5 is terminal.
    pub fn successor(self) -> Option<StageLevel> {
        match self {
            StageLevel::Basic => Some(StageLevel::Sealed),
            StageLevel::Sealed => Some(StageLevel::Minimized),
            StageLevel::Minimized => Some(StageLevel::Hardened),
            StageLevel::Hardened => Some(StageLevel::FullySealed),
            StageLevel::FullySealed => None,
        }
    }
}

impl TryFrom<u32> for StageLevel {
    type Error = GovernanceError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(StageLevel::Basic),
            1 => Ok(StageLevel::Sealed),
            3 => Ok(StageLevel::Minimized),
            4 => Ok(StageLevel::Hardened),
            5 => Ok(StageLevel::FullySealed),
            other => Err(GovernanceError::InvalidStageLevel(other)),
        }
    }
}

impl std::fmt::Display for StageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// A governed handle over one pipeline artifact.
///
/// The token borrows the artifact's byte region for its lifetime; the engine
/// owns the bookkeeping around the region, never the region itself. A token
/// is created once per artifact at its claimed stage, mutated in place by
/// each successful verification (entropy, checksum, timestamp), and dropped
/// when the artifact is discarded.
#[derive(Clone, Debug)]
pub struct MemoryToken<'a> {
    /// Engine-unique identifier, monotonically assigned at creation.
    pub token_id: u64,
    /// Declared assurance tier.
    pub stage_level: StageLevel,
    /// Non-cryptographic fingerprint of the region at creation.
    pub memory_hash: u64,
    /// Shannon entropy at last verification, in micro-bits per byte.
    pub entropy_signature: u64,
    /// Integrity tripwire over the governed fields.
    pub context_checksum: u64,
    /// Governance policy flags (see [`flags`]).
    pub governance_flags: u32,
    /// The governed byte region, borrowed from the pipeline.
    pub region: &'a [u8],
    /// Proof of cryptographic sealing by the external signer. Required
    /// non-empty from stage 1 onward.
    pub stage_signature: String,
    /// Once set, the token may never move to a lower stage except through
    /// an explicit governance override.
    pub anti_reversion_lock: bool,
    pub timestamp_created: DateTime<Utc>,
    pub timestamp_last_verified: Option<DateTime<Utc>>,
}

impl<'a> MemoryToken<'a> {
    /// Size of the governed region in bytes.
    pub fn allocated_bytes(&self) -> usize {
        self.region.len()
    }

    /// Whether the encryption flag is present.
    pub fn is_encrypted(&self) -> bool {
        self.governance_flags & flags::ENCRYPTED != 0
    }

    /// Re-stamp the last-verified timestamp. Called by every passing gate.
    pub(crate) fn stamp_verified(&mut self) {
        self.timestamp_last_verified = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_levels_are_ordered() {
        assert!(StageLevel::Basic < StageLevel::Sealed);
        assert!(StageLevel::Sealed < StageLevel::Minimized);
        assert!(StageLevel::Minimized < StageLevel::Hardened);
        assert!(StageLevel::Hardened < StageLevel::FullySealed);
    }

    #[test]
    fn stage_two_is_not_on_the_ladder() {
        assert!(StageLevel::try_from(2).is_err());
        assert!(StageLevel::try_from(6).is_err());
    }

    #[test]
    fn numeric_levels_round_trip() {
        for level in [0u32, 1, 3, 4, 5] {
            let stage = StageLevel::try_from(level).unwrap();
            assert_eq!(stage.level(), level);
        }
    }

    #[test]
    fn ladder_successors_are_the_four_forward_edges() {
        assert_eq!(StageLevel::Basic.successor(), Some(StageLevel::Sealed));
        assert_eq!(StageLevel::Sealed.successor(), Some(StageLevel::Minimized));
        assert_eq!(StageLevel::Minimized.successor(), Some(StageLevel::Hardened));
        assert_eq!(
            StageLevel::Hardened.successor(),
            Some(StageLevel::FullySealed)
        );
        assert_eq!(StageLevel::FullySealed.successor(), None);
    }

    #[test]
    fn encryption_flag_is_bit_0x40() {
        let region = [0u8; 4];
        let mut token = MemoryToken {
            token_id: 1,
            stage_level: StageLevel::Basic,
            memory_hash: 0,
            entropy_signature: 0,
            context_checksum: 0,
            governance_flags: 0,
            region: &region,
            stage_signature: String::new(),
            anti_reversion_lock: false,
            timestamp_created: Utc::now(),
            timestamp_last_verified: None,
        };

        assert!(!token.is_encrypted());
        token.governance_flags = 0x3f; // every bit below the encryption bit
        assert!(!token.is_encrypted());
        token.governance_flags |= flags::ENCRYPTED;
        assert!(token.is_encrypted());
    }
}

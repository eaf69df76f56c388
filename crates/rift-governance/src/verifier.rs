//! The five stage gates, monotonically stricter.
//!
//! Each gate is a predicate over (token, contract). Higher gates re-run the
//! evidence checks of every lower gate by explicitly calling the lower
//! evidence function — tokens are long-lived handles over memory the
//! pipeline mutates between verifications, so nothing since the last check
//! is trusted. The `stage_level == N` equality is checked once at the entry
//! predicate; the shared evidence bodies are stage-agnostic so re-runs
//! compose.

use tracing::{debug, warn};

use crate::contract::GovernanceContract;
use crate::evidence::{context_checksum, shannon_entropy, signature_entropy};
use crate::token::{MemoryToken, StageLevel};
use crate::violation::ViolationKind;

/// Entropy tolerance between the stored signature and a fresh measurement.
pub const ENTROPY_TOLERANCE: f64 = 0.05;

/// Absolute entropy floor for stage 5, in bits per byte. Not contract
/// configurable.
pub const STAGE_5_ENTROPY_FLOOR: f64 = 6.0;

/// A failed gate condition, ready to be recorded as a violation.
#[derive(Clone, Debug, PartialEq)]
pub struct StageFailure {
    pub kind: ViolationKind,
    pub message: String,
}

impl StageFailure {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Dispatch to the gate matching the token's declared stage.
///
/// Re-stamps `timestamp_last_verified` on success; reports the first failed
/// condition otherwise.
pub fn verify(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    match token.stage_level {
        StageLevel::Basic => verify_stage_0(token, contract),
        StageLevel::Sealed => verify_stage_1(token, contract),
        StageLevel::Minimized => verify_stage_3(token, contract),
        StageLevel::Hardened => verify_stage_4(token, contract),
        StageLevel::FullySealed => verify_stage_5(token, contract),
    }
}

/// Stage 0 — basic_optional.
pub fn verify_stage_0(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    gate(token, contract, StageLevel::Basic, stage_0_evidence)
}

/// Stage 1 — sealed_signature.
pub fn verify_stage_1(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    gate(token, contract, StageLevel::Sealed, stage_1_evidence)
}

/// Stage 3 — obfuscated_minimized_entropy_aware.
pub fn verify_stage_3(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    gate(token, contract, StageLevel::Minimized, stage_3_evidence)
}

/// Stage 4 — hardened_encrypted_context_validated.
pub fn verify_stage_4(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    gate(token, contract, StageLevel::Hardened, stage_4_evidence)
}

/// Stage 5 — fully_sealed_anti_reversion.
pub fn verify_stage_5(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    gate(token, contract, StageLevel::FullySealed, stage_5_evidence)
}

/// Shared gate entry: stage equality, evidence, timestamp re-stamp.
fn gate(
    token: &mut MemoryToken<'_>,
    contract: &GovernanceContract,
    expected: StageLevel,
    evidence: fn(&MemoryToken<'_>, &GovernanceContract) -> Result<(), StageFailure>,
) -> Result<(), StageFailure> {
    debug!(
        token_id = token.token_id,
        gate = expected.gate_name(),
        "Verifying stage gate"
    );

    if token.stage_level != expected {
        let failure = StageFailure::new(
            ViolationKind::InvalidStageTransition,
            format!(
                "stage {} gate invoked on stage {} token",
                expected, token.stage_level
            ),
        );
        warn!(
            token_id = token.token_id,
            gate = expected.gate_name(),
            declared = %token.stage_level,
            "Stage gate failed: stage level mismatch"
        );
        return Err(failure);
    }

    match evidence(token, contract) {
        Ok(()) => {
            token.stamp_verified();
            debug!(
                token_id = token.token_id,
                gate = expected.gate_name(),
                "Stage gate passed"
            );
            Ok(())
        }
        Err(failure) => {
            warn!(
                token_id = token.token_id,
                gate = expected.gate_name(),
                reason = %failure.message,
                "Stage gate failed"
            );
            Err(failure)
        }
    }
}

// ---------------------------------------------------------------------------
// Evidence chain. Each function re-runs the previous one in full.
// ---------------------------------------------------------------------------

/// Stage-0 evidence: a real, non-empty governed region.
pub(crate) fn stage_0_evidence(
    token: &MemoryToken<'_>,
    _contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    if token.region.is_empty() || token.allocated_bytes() == 0 {
        return Err(StageFailure::new(
            ViolationKind::MemoryCorruption,
            "invalid memory allocation: empty governed region",
        ));
    }
    Ok(())
}

/// Stage-1 evidence: stage-0 plus a present seal signature and fingerprint.
pub(crate) fn stage_1_evidence(
    token: &MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    stage_0_evidence(token, contract)?;

    if token.stage_signature.is_empty() {
        return Err(StageFailure::new(
            ViolationKind::SignatureMismatch,
            "missing stage signature",
        ));
    }
    if token.memory_hash == 0 {
        return Err(StageFailure::new(
            ViolationKind::SignatureMismatch,
            "missing memory hash",
        ));
    }
    Ok(())
}

/// Stage-3 evidence: stage-1 plus entropy tolerance, checksum integrity,
/// and the contract's entropy threshold.
pub(crate) fn stage_3_evidence(
    token: &MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    stage_1_evidence(token, contract)?;

    let current = shannon_entropy(token.region);
    let expected = signature_entropy(token.entropy_signature);
    if (current - expected).abs() > ENTROPY_TOLERANCE {
        return Err(StageFailure::new(
            ViolationKind::MemoryCorruption,
            format!(
                "entropy mismatch: measured {:.6}, signature {:.6}",
                current, expected
            ),
        ));
    }

    if context_checksum(token) != token.context_checksum {
        return Err(StageFailure::new(
            ViolationKind::ContextIntegrityFailed,
            "context_checksum mismatch",
        ));
    }

    if ((current * 100.0) as u32) < contract.entropy_threshold_percent {
        return Err(StageFailure::new(
            ViolationKind::EntropyThresholdFailed,
            format!(
                "entropy {:.6} below contract threshold of {} hundredths",
                current, contract.entropy_threshold_percent
            ),
        ));
    }

    Ok(())
}

/// Stage-4 evidence: full stage-3 re-run plus hardening flags, a second
/// checksum validation, and the encryption bit.
pub(crate) fn stage_4_evidence(
    token: &MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    stage_3_evidence(token, contract)?;

    if token.governance_flags == 0 {
        return Err(StageFailure::new(
            ViolationKind::GovernancePolicyBreach,
            "missing governance flags",
        ));
    }

    if context_checksum(token) != token.context_checksum {
        return Err(StageFailure::new(
            ViolationKind::ContextIntegrityFailed,
            "context integrity check failed",
        ));
    }

    if !token.is_encrypted() {
        return Err(StageFailure::new(
            ViolationKind::GovernancePolicyBreach,
            "encryption not applied",
        ));
    }

    Ok(())
}

/// Stage-5 evidence: full stage-4 re-run plus the anti-reversion lock, the
/// absolute entropy floor, and a final checksum validation.
pub(crate) fn stage_5_evidence(
    token: &MemoryToken<'_>,
    contract: &GovernanceContract,
) -> Result<(), StageFailure> {
    stage_4_evidence(token, contract)?;

    if !token.anti_reversion_lock {
        return Err(StageFailure::new(
            ViolationKind::GovernancePolicyBreach,
            "anti-reversion lock not active",
        ));
    }

    let current = shannon_entropy(token.region);
    if current < STAGE_5_ENTROPY_FLOOR {
        return Err(StageFailure::new(
            ViolationKind::EntropyThresholdFailed,
            format!(
                "insufficient entropy for full seal ({:.6} < {:.1})",
                current, STAGE_5_ENTROPY_FLOOR
            ),
        ));
    }

    if context_checksum(token) != token.context_checksum {
        return Err(StageFailure::new(
            ViolationKind::ContextIntegrityFailed,
            "final integrity validation failed",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{entropy_signature, memory_hash};
    use crate::token::flags;
    use chrono::Utc;

    /// 1024 bytes spanning the full byte alphabet: entropy exactly 8.0.
    fn high_entropy_region() -> Vec<u8> {
        (0..=255u8).cycle().take(1024).collect()
    }

    /// A token whose evidence is internally consistent for `stage`.
    fn valid_token(stage: StageLevel, region: &[u8]) -> MemoryToken<'_> {
        let mut token = MemoryToken {
            token_id: 7,
            stage_level: stage,
            memory_hash: memory_hash(region),
            entropy_signature: entropy_signature(shannon_entropy(region)),
            context_checksum: 0,
            governance_flags: flags::ENCRYPTED,
            region,
            stage_signature: "sealed:test".into(),
            anti_reversion_lock: true,
            timestamp_created: Utc::now(),
            timestamp_last_verified: None,
        };
        token.context_checksum = context_checksum(&token);
        token
    }

    fn contract() -> GovernanceContract {
        GovernanceContract::default()
    }

    #[test]
    fn every_gate_rejects_wrong_stage_level() {
        let region = high_entropy_region();
        let gates: [(
            StageLevel,
            fn(&mut MemoryToken<'_>, &GovernanceContract) -> Result<(), StageFailure>,
        ); 5] = [
            (StageLevel::Basic, verify_stage_0),
            (StageLevel::Sealed, verify_stage_1),
            (StageLevel::Minimized, verify_stage_3),
            (StageLevel::Hardened, verify_stage_4),
            (StageLevel::FullySealed, verify_stage_5),
        ];

        for (expected, gate_fn) in gates {
            for declared in [
                StageLevel::Basic,
                StageLevel::Sealed,
                StageLevel::Minimized,
                StageLevel::Hardened,
                StageLevel::FullySealed,
            ] {
                if declared == expected {
                    continue;
                }
                let mut token = valid_token(declared, &region);
                let failure = gate_fn(&mut token, &contract()).unwrap_err();
                assert_eq!(failure.kind, ViolationKind::InvalidStageTransition);
            }
        }
    }

    #[test]
    fn stage_0_passes_on_minimal_token() {
        let region = [1u8, 2, 3];
        let mut token = valid_token(StageLevel::Basic, &region);
        assert!(verify_stage_0(&mut token, &contract()).is_ok());
        assert!(token.timestamp_last_verified.is_some());
    }

    #[test]
    fn stage_0_rejects_empty_region() {
        let mut token = valid_token(StageLevel::Basic, &[]);
        let failure = verify_stage_0(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::MemoryCorruption);
        assert!(token.timestamp_last_verified.is_none());
    }

    #[test]
    fn stage_1_requires_signature() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Sealed, &region);
        token.stage_signature.clear();
        let failure = verify_stage_1(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::SignatureMismatch);
    }

    #[test]
    fn stage_1_requires_memory_hash() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Sealed, &region);
        token.memory_hash = 0;
        token.context_checksum = context_checksum(&token);
        let failure = verify_stage_1(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::SignatureMismatch);
        assert_eq!(failure.message, "missing memory hash");
    }

    #[test]
    fn stage_3_passes_on_high_entropy_buffer() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Minimized, &region);
        assert!(verify_stage_3(&mut token, &contract()).is_ok());
    }

    #[test]
    fn stage_3_detects_entropy_drift() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Minimized, &region);
        // Signature claims far lower entropy than the region measures.
        token.entropy_signature = entropy_signature(4.0);
        token.context_checksum = context_checksum(&token);
        let failure = verify_stage_3(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::MemoryCorruption);
    }

    #[test]
    fn stage_3_detects_checksum_mismatch() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Minimized, &region);
        token.context_checksum ^= 0xDEAD;
        let failure = verify_stage_3(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::ContextIntegrityFailed);
    }

    #[test]
    fn stage_3_enforces_contract_entropy_threshold() {
        // Nearly uniform region: entropy ~0.01 bits/byte, far below a
        // 75-hundredths (0.75 bits/byte) threshold.
        let mut region = vec![0u8; 1024];
        region[0] = 1;
        let strict = GovernanceContract::builder("strict")
            .entropy_threshold_percent(75)
            .build()
            .unwrap();
        let mut token = valid_token(StageLevel::Minimized, &region);
        let failure = verify_stage_3(&mut token, &strict).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::EntropyThresholdFailed);
    }

    #[test]
    fn stage_4_requires_nonzero_flags() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Hardened, &region);
        token.governance_flags = 0;
        let failure = verify_stage_4(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::GovernancePolicyBreach);
        assert_eq!(failure.message, "missing governance flags");
    }

    #[test]
    fn stage_4_requires_encryption_bit() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Hardened, &region);
        // Nonzero flags, but without bit 0x40.
        token.governance_flags = 0x01;
        let failure = verify_stage_4(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::GovernancePolicyBreach);
        assert_eq!(failure.message, "encryption not applied");
    }

    #[test]
    fn stage_5_requires_anti_reversion_lock() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::FullySealed, &region);
        token.anti_reversion_lock = false;
        let failure = verify_stage_5(&mut token, &contract()).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::GovernancePolicyBreach);
    }

    #[test]
    fn stage_5_enforces_absolute_entropy_floor() {
        // 1 bit/byte passes any reasonable contract threshold but sits far
        // below the fixed 6.0 floor.
        let region: Vec<u8> = [0u8, 1u8].iter().cycle().take(1024).copied().collect();
        let lax = GovernanceContract::builder("lax")
            .entropy_threshold_percent(0)
            .build()
            .unwrap();
        let mut token = valid_token(StageLevel::FullySealed, &region);
        let failure = verify_stage_5(&mut token, &lax).unwrap_err();
        assert_eq!(failure.kind, ViolationKind::EntropyThresholdFailed);
    }

    #[test]
    fn stage_5_pass_implies_all_lower_evidence_holds() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::FullySealed, &region);
        assert!(verify_stage_5(&mut token, &contract()).is_ok());

        // Full re-run, not cached: every lower evidence predicate holds
        // independently for the same token.
        let c = contract();
        assert!(stage_4_evidence(&token, &c).is_ok());
        assert!(stage_3_evidence(&token, &c).is_ok());
        assert!(stage_1_evidence(&token, &c).is_ok());
        assert!(stage_0_evidence(&token, &c).is_ok());
    }

    #[test]
    fn dispatch_routes_by_declared_stage() {
        let region = high_entropy_region();
        let mut token = valid_token(StageLevel::Minimized, &region);
        assert!(verify(&mut token, &contract()).is_ok());

        let mut token = valid_token(StageLevel::FullySealed, &region);
        assert!(verify(&mut token, &contract()).is_ok());
    }
}

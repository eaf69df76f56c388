//! Forward-only stage transition control.
//!
//! Legal forward edges are 0→1, 1→3, 3→4, 4→5 (each additionally subject to
//! the contract's edge mask); stage 5 is terminal. Backward transitions are
//! rejected outright under the anti-reversion lock, rejected without
//! governance authorization otherwise, and permitted only as an explicit,
//! logged override. There is no silent downgrade path.

use rift_equivalence::MinimizationProof;
use tracing::{debug, warn};

use crate::contract::GovernanceContract;
use crate::token::{MemoryToken, StageLevel};
use crate::violation::ViolationKind;

/// Outcome of a transition request.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionDecision {
    /// Legal forward transition.
    Allow,
    /// Backward transition permitted by explicit governance authority.
    /// The caller MUST record the override; it is never silent.
    AllowWithOverride,
    /// Transition rejected.
    Deny {
        kind: ViolationKind,
        message: String,
        /// Whether governance authorization could have permitted it.
        override_available: bool,
    },
}

impl TransitionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            TransitionDecision::Allow | TransitionDecision::AllowWithOverride
        )
    }

    pub fn is_override(&self) -> bool {
        matches!(self, TransitionDecision::AllowWithOverride)
    }

    fn deny(kind: ViolationKind, message: impl Into<String>) -> Self {
        TransitionDecision::Deny {
            kind,
            message: message.into(),
            override_available: false,
        }
    }

    fn deny_overridable(kind: ViolationKind, message: impl Into<String>) -> Self {
        TransitionDecision::Deny {
            kind,
            message: message.into(),
            override_available: true,
        }
    }
}

/// Decide whether `token` may move to `target`.
///
/// For the 3→4 edge, a state-minimization equivalence proof is a
/// non-bypassable precondition: a missing or unproven proof denies the
/// transition regardless of everything else.
pub fn evaluate_transition(
    token: &MemoryToken<'_>,
    target: StageLevel,
    governance_mode: bool,
    contract: &GovernanceContract,
    proof: Option<&MinimizationProof>,
) -> TransitionDecision {
    let current = token.stage_level;
    debug!(
        token_id = token.token_id,
        from = %current,
        to = %target,
        governance_mode,
        "Evaluating stage transition"
    );

    if target < current {
        return evaluate_backward(token, target, governance_mode, contract);
    }

    if target == current {
        return TransitionDecision::deny(
            ViolationKind::InvalidStageTransition,
            format!("token already at stage {}", current),
        );
    }

    // Forward: exactly one legal successor per stage, and the contract's
    // edge mask must leave it open.
    if current.successor() != Some(target) || !contract.allows_transition(current, target) {
        warn!(
            token_id = token.token_id,
            from = %current,
            to = %target,
            "BLOCKED: invalid forward transition"
        );
        return TransitionDecision::deny(
            ViolationKind::InvalidStageTransition,
            format!("invalid forward transition: stage {} -> {}", current, target),
        );
    }

    // The 3→4 edge carries the stage-3 proof obligation.
    if current == StageLevel::Minimized && target == StageLevel::Hardened {
        match proof {
            Some(proof) if proof.equivalence_proven => {}
            _ => {
                warn!(
                    token_id = token.token_id,
                    "BLOCKED: state-minimization equivalence not proven"
                );
                return TransitionDecision::deny(
                    ViolationKind::GovernancePolicyBreach,
                    "state-minimization equivalence not proven for 3 -> 4",
                );
            }
        }
    }

    TransitionDecision::Allow
}

/// Backward requests. The anti-reversion lock rejects any downgrade not
/// carrying governance authority; an asserted `governance_mode` pierces the
/// lock, but only as an explicit override the engine must record.
fn evaluate_backward(
    token: &MemoryToken<'_>,
    target: StageLevel,
    governance_mode: bool,
    contract: &GovernanceContract,
) -> TransitionDecision {
    let current = token.stage_level;

    if governance_mode {
        if !contract.allows_governance_override() {
            return TransitionDecision::deny(
                ViolationKind::GovernancePolicyBreach,
                "active contract does not permit governance overrides",
            );
        }
        warn!(
            token_id = token.token_id,
            from = %current,
            to = %target,
            "Governance override permits backward transition"
        );
        return TransitionDecision::AllowWithOverride;
    }

    if token.anti_reversion_lock {
        warn!(
            token_id = token.token_id,
            from = %current,
            to = %target,
            "BLOCKED: anti-reversion lock"
        );
        return TransitionDecision::deny(
            ViolationKind::AntiReversionBlocked,
            format!(
                "BLOCKED: anti-reversion lock prevents stage {} -> {}",
                current, target
            ),
        );
    }

    warn!(
        token_id = token.token_id,
        from = %current,
        to = %target,
        "BLOCKED: backward transition requires governance authorization"
    );
    TransitionDecision::deny_overridable(
        ViolationKind::InvalidStageTransition,
        "backward transition requires governance authorization",
    )
}

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scoring::{simulate_minimized, simulate_redundant, ScoringTrace};

/// Outcome of an equivalence validation run.
///
/// Consumed by the stage-3 governance gate: a minimized artifact may not
/// advance to stage 4 unless `equivalence_proven` is true. The proof is
/// immutable once produced; governance records it as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinimizationProof {
    /// States tracked by the original (redundant) structure.
    pub original_states: u64,
    /// States tracked by the minimized structure.
    pub minimized_states: u64,
    /// Percentage of states eliminated by the transform.
    pub reduction_percentage: f64,
    /// True only if the reduction is real AND observable behavior matched.
    pub equivalence_proven: bool,
}

impl MinimizationProof {
    /// A proof that demonstrates nothing. Used when validation could not run;
    /// governance treats it as a failed obligation.
    pub fn unproven() -> Self {
        Self {
            original_states: 0,
            minimized_states: 0,
            reduction_percentage: 0.0,
            equivalence_proven: false,
        }
    }
}

/// Validator for the stage-3 proof obligation.
///
/// Runs the redundant and minimized reference procedures for a fixed number
/// of repetitions, then accepts equivalence only if the minimized procedure
/// visited strictly fewer states, the reduction is positive, and both
/// procedures produced identical observable outcomes.
pub struct EquivalenceValidator {
    repetitions: u32,
}

impl EquivalenceValidator {
    /// Reference case repetition count used by the governance gate.
    pub const REFERENCE_REPETITIONS: u32 = 5;

    pub fn new(repetitions: u32) -> Self {
        Self { repetitions }
    }

    /// Validator configured for the reference case (5 repetitions).
    pub fn reference() -> Self {
        Self::new(Self::REFERENCE_REPETITIONS)
    }

    /// Run both procedures and produce a proof.
    pub fn prove(&self) -> MinimizationProof {
        let original = simulate_redundant(self.repetitions);
        let minimized = simulate_minimized(self.repetitions);
        self.prove_with(&original, &minimized)
    }

    /// Judge a pair of already-simulated traces.
    ///
    /// The semantic-equivalence check is independent of the state counts:
    /// identical counts with diverging outcomes fail, and a real reduction
    /// with diverging outcomes also fails.
    pub fn prove_with(
        &self,
        original: &ScoringTrace,
        minimized: &ScoringTrace,
    ) -> MinimizationProof {
        let reduction_percentage = if original.tracked_states > 0 {
            original.tracked_states.saturating_sub(minimized.tracked_states) as f64
                / original.tracked_states as f64
                * 100.0
        } else {
            0.0
        };

        let reduced = minimized.tracked_states < original.tracked_states
            && reduction_percentage > 0.0;

        let semantically_equivalent = semantic_equivalence(original, minimized);

        let equivalence_proven = reduced && semantically_equivalent;

        if equivalence_proven {
            info!(
                original = original.tracked_states,
                minimized = minimized.tracked_states,
                reduction = reduction_percentage,
                "State minimization equivalence proven"
            );
        } else {
            warn!(
                original = original.tracked_states,
                minimized = minimized.tracked_states,
                reduced,
                semantically_equivalent,
                "State minimization equivalence NOT proven"
            );
        }

        MinimizationProof {
            original_states: original.tracked_states,
            minimized_states: minimized.tracked_states,
            reduction_percentage,
            equivalence_proven,
        }
    }
}

impl Default for EquivalenceValidator {
    fn default() -> Self {
        Self::reference()
    }
}

/// Independent semantic-equivalence check between two traces.
///
/// Two structures are semantically equivalent when their externally
/// observable outcome sequences are identical. State counts play no part
/// here; that is the whole point of minimization.
pub fn semantic_equivalence(original: &ScoringTrace, minimized: &ScoringTrace) -> bool {
    let equal = original.outcomes == minimized.outcomes;
    debug!(
        original_outcomes = original.outcomes.len(),
        minimized_outcomes = minimized.outcomes.len(),
        equal,
        "Semantic equivalence check"
    );
    equal
}

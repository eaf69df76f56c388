//! State-minimization equivalence proofs for the RIFT governance ladder.
//!
//! Stage 3 of the RIFT pipeline ("obfuscated + minimized + entropy-aware")
//! applies a structure-minimizing transform to the parsed tree. Before a
//! minimized artifact may advance to stage 4, governance requires a formal
//! demonstration that the transform preserved externally observable behavior.
//!
//! The proof is modeled on a reference case: two procedures that score the
//! same sequence of games, one tracking every branch redundantly (both
//! players' positions on every point) and one tracking only the taken branch
//! (the winning player's progression). Both produce identical observable
//! outcomes; the minimized procedure visits strictly fewer states.
//!
//! A [`MinimizationProof`] is accepted only when all three hold:
//!
//! 1. `minimized_states < original_states`
//! 2. `reduction_percentage > 0`
//! 3. the observable outcome sequences of both procedures are identical
//!    (semantic equivalence, checked independently of the state counts)

pub mod scoring;
pub mod validator;

pub use scoring::{GameOutcome, Score, ScoringTrace};
pub use validator::{EquivalenceValidator, MinimizationProof};

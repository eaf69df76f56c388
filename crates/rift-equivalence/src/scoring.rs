use serde::{Deserialize, Serialize};

/// Score ladder for the reference scoring FSM.
///
/// A four-step progression to a terminal state. The server wins every point,
/// so the opponent never leaves [`Score::Love`] — which is exactly the
/// redundancy the minimized procedure eliminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Love,
    Fifteen,
    Thirty,
    Forty,
    Game,
}

impl Score {
    /// Advance one point. Terminal state is absorbing.
    pub fn advance(self) -> Score {
        match self {
            Score::Love => Score::Fifteen,
            Score::Fifteen => Score::Thirty,
            Score::Thirty => Score::Forty,
            Score::Forty => Score::Game,
            Score::Game => Score::Game,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Score::Game)
    }
}

/// Externally observable outcome of one game.
///
/// Both scoring procedures must produce the same outcome sequence for
/// semantic equivalence to hold; internal state counts are not observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    ServerWins,
}

/// Result of simulating one scoring procedure: the number of tracked states
/// and the observable outcome per game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoringTrace {
    pub tracked_states: u64,
    pub outcomes: Vec<GameOutcome>,
}

/// Redundant procedure: tracks both players' positions on every point.
///
/// The opponent stays at Love for the whole game, but the procedure still
/// carries that state through every transition — two tracked states per
/// point instead of one.
pub fn simulate_redundant(games: u32) -> ScoringTrace {
    let mut trace = ScoringTrace {
        tracked_states: 0,
        outcomes: Vec::with_capacity(games as usize),
    };

    for _ in 0..games {
        // Full product state: (server, opponent). The opponent never scores,
        // but the conventional procedure still carries its component through
        // every transition.
        let mut state = (Score::Love, Score::Love);

        while !state.0.is_terminal() {
            state = (state.0.advance(), state.1);
            trace.tracked_states += 2;
        }

        trace.outcomes.push(GameOutcome::ServerWins);
    }

    trace
}

/// Minimized procedure: tracks only the branch actually taken.
///
/// Only the server's progression is carried; the opponent's frozen state is
/// elided entirely. Same outcome per game, half the tracked states.
pub fn simulate_minimized(games: u32) -> ScoringTrace {
    let mut trace = ScoringTrace {
        tracked_states: 0,
        outcomes: Vec::with_capacity(games as usize),
    };

    for _ in 0..games {
        let mut server = Score::Love;

        while !server.is_terminal() {
            server = server.advance();
            trace.tracked_states += 1;
        }

        trace.outcomes.push(GameOutcome::ServerWins);
    }

    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn score_ladder_reaches_game_in_four_points() {
        let mut score = Score::Love;
        let mut points = 0;
        while !score.is_terminal() {
            score = score.advance();
            points += 1;
        }
        assert_eq!(points, 4);
    }

    #[test]
    fn terminal_state_is_absorbing() {
        assert_eq!(Score::Game.advance(), Score::Game);
    }

    #[test]
    fn redundant_procedure_tracks_both_players() {
        let trace = simulate_redundant(5);
        // 4 points per game, 2 tracked states per point, 5 games.
        assert_eq!(trace.tracked_states, 40);
        assert_eq!(trace.outcomes.len(), 5);
    }

    #[test]
    fn minimized_procedure_tracks_only_taken_branch() {
        let trace = simulate_minimized(5);
        // 4 points per game, 1 tracked state per point, 5 games.
        assert_eq!(trace.tracked_states, 20);
        assert_eq!(trace.outcomes.len(), 5);
    }

    #[test]
    fn both_procedures_observe_identical_outcomes() {
        let a = simulate_redundant(7);
        let b = simulate_minimized(7);
        assert_eq!(a.outcomes, b.outcomes);
    }

    #[test]
    fn zero_games_produces_empty_trace() {
        let trace = simulate_minimized(0);
        assert_eq!(trace.tracked_states, 0);
        assert!(trace.outcomes.is_empty());
    }

    proptest! {
        #[test]
        fn redundant_procedure_tracks_exactly_double(games in 0u32..256) {
            let redundant = simulate_redundant(games);
            let minimized = simulate_minimized(games);
            prop_assert_eq!(redundant.tracked_states, 2 * minimized.tracked_states);
        }

        #[test]
        fn outcome_traces_agree_for_any_repetition_count(games in 0u32..256) {
            prop_assert_eq!(
                simulate_redundant(games).outcomes,
                simulate_minimized(games).outcomes
            );
        }
    }
}

//! Action policy: when to ask the oracle, and how to read its scores

use rand::Rng;

use dino_rl_core::{Action, EnvironmentState, FlightState, Scores};

use crate::agent::Snapshots;

/// Decides whether a frame samples the oracle and maps scores to an action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionPolicy {
    /// Chance per frame of re-asking while jumping or ducking
    resample_probability: f64,
}

impl ActionPolicy {
    /// Create a policy with the given airborne/ducking resample chance
    #[must_use]
    pub fn new(resample_probability: f64) -> Self {
        Self {
            resample_probability: resample_probability.clamp(0.0, 1.0),
        }
    }

    /// Resample chance while jumping or ducking
    #[must_use]
    pub fn resample_probability(&self) -> f64 {
        self.resample_probability
    }

    /// Sampling gate.
    ///
    /// Always open while running upright. While jumping or ducking a uniform
    /// draw must exceed `1 - resample_probability` (0.9 by default).
    pub fn should_sample<R: Rng + ?Sized>(&self, flight: FlightState, rng: &mut R) -> bool {
        match flight {
            FlightState::Running => true,
            FlightState::Jumping | FlightState::Ducking => {
                rng.gen::<f64>() > 1.0 - self.resample_probability
            }
        }
    }

    /// Strict-maximum selection; any tie falls through to Run
    #[must_use]
    pub fn select(scores: &Scores) -> Action {
        let [jump, duck, run] = scores.0;
        if jump > duck && jump > run {
            Action::Jump
        } else if duck > jump && duck > run {
            Action::Duck
        } else {
            Action::Run
        }
    }

    /// Apply a resolved prediction: record scores and state, then write
    /// exactly one branch snapshot for the chosen action.
    pub fn record(snapshots: &mut Snapshots, state: Option<EnvironmentState>, scores: Scores) -> Action {
        snapshots.last_prediction = Some(scores);
        snapshots.last_state = state;

        let action = Self::select(&scores);
        match action {
            Action::Jump => snapshots.last_jumping_state = state,
            Action::Duck => snapshots.last_ducking_state = state,
            Action::Run => snapshots.last_running_state = state,
        }
        action
    }
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self::new(0.1)
    }
}

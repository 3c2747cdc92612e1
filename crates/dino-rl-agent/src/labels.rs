//! Crash labeling: fixed soft targets keyed by how the agent crashed

use dino_rl_core::{ActionLabel, EnvironmentState, FlightState, Vectorizer};

use crate::agent::Snapshots;
use crate::buffer::Example;

/// Discrete crash outcome a training example is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashOutcome {
    /// Hit something while airborne
    Jumping,
    /// Secondary airborne example: should have come down sooner
    FastFall,
    /// Hit something while ducking
    Ducking,
    /// Hit something while running upright
    Running,
}

/// Outcome → label table, indexed by discriminant. Values are graded
/// shaping targets, not one-hot.
pub const CRASH_LABELS: [(CrashOutcome, [f64; 3]); 4] = [
    (CrashOutcome::Jumping, [0.0, 0.25, 1.0]),
    (CrashOutcome::FastFall, [0.0, 0.5, 0.3]),
    (CrashOutcome::Ducking, [0.5, 0.0, 1.0]),
    (CrashOutcome::Running, [1.0, 0.8, 0.0]),
];

impl CrashOutcome {
    /// Outcomes to record for a crash in `flight`, in append order
    #[must_use]
    pub fn for_flight(flight: FlightState) -> &'static [CrashOutcome] {
        match flight {
            FlightState::Jumping => &[CrashOutcome::Jumping, CrashOutcome::FastFall],
            FlightState::Ducking => &[CrashOutcome::Ducking],
            FlightState::Running => &[CrashOutcome::Running],
        }
    }

    /// Training target for this outcome
    #[must_use]
    pub fn label(self) -> ActionLabel {
        ActionLabel(CRASH_LABELS[self as usize].1)
    }

    /// Snapshot the example's input is built from
    #[must_use]
    pub fn source(self, snapshots: &Snapshots) -> Option<&EnvironmentState> {
        match self {
            Self::Jumping => snapshots.last_jumping_state.as_ref(),
            Self::FastFall => snapshots.last_state.as_ref(),
            Self::Ducking => snapshots.last_ducking_state.as_ref(),
            Self::Running => snapshots.last_running_state.as_ref(),
        }
    }
}

/// Turns a crash into training examples from cached snapshots
#[derive(Debug, Clone, Copy)]
pub struct CrashLabeler {
    vectorizer: Vectorizer,
}

impl CrashLabeler {
    /// Create a labeler
    #[must_use]
    pub fn new(vectorizer: Vectorizer) -> Self {
        Self { vectorizer }
    }

    /// Examples for a crash in `flight`; a missing snapshot vectorizes to zeros
    #[must_use]
    pub fn label(&self, flight: FlightState, snapshots: &Snapshots) -> Vec<Example> {
        CrashOutcome::for_flight(flight)
            .iter()
            .map(|outcome| {
                Example::new(
                    self.vectorizer.vectorize(outcome.source(snapshots)),
                    outcome.label(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dino_rl_core::FeatureVector;

    fn state(x: f64) -> EnvironmentState {
        EnvironmentState {
            obstacle_x: x,
            obstacle_y: 75.0,
            obstacle_width: 30.0,
            speed: 50.0,
        }
    }

    fn snapshots() -> Snapshots {
        Snapshots {
            last_jumping_state: Some(state(60.0)),
            last_ducking_state: Some(state(120.0)),
            last_running_state: Some(state(180.0)),
            last_state: Some(state(240.0)),
            last_prediction: None,
        }
    }

    #[test]
    fn table_rows_follow_discriminants() {
        for (index, (outcome, _)) in CRASH_LABELS.iter().enumerate() {
            assert_eq!(*outcome as usize, index);
        }
    }

    #[test]
    fn label_table_values() {
        assert_eq!(CrashOutcome::Jumping.label().0, [0.0, 0.25, 1.0]);
        assert_eq!(CrashOutcome::FastFall.label().0, [0.0, 0.5, 0.3]);
        assert_eq!(CrashOutcome::Ducking.label().0, [0.5, 0.0, 1.0]);
        assert_eq!(CrashOutcome::Running.label().0, [1.0, 0.8, 0.0]);
    }

    #[test]
    fn jumping_crash_yields_two_examples_in_order() {
        let labeler = CrashLabeler::new(Vectorizer::default());
        let examples = labeler.label(FlightState::Jumping, &snapshots());

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].input.0[0], 0.1);
        assert_eq!(examples[0].label.0, [0.0, 0.25, 1.0]);
        assert_eq!(examples[1].input.0[0], 0.4);
        assert_eq!(examples[1].label.0, [0.0, 0.5, 0.3]);
    }

    #[test]
    fn ducking_and_running_crashes_use_their_snapshot() {
        let labeler = CrashLabeler::new(Vectorizer::default());

        let ducking = labeler.label(FlightState::Ducking, &snapshots());
        assert_eq!(ducking.len(), 1);
        assert_eq!(ducking[0].input.0[0], 0.2);
        assert_eq!(ducking[0].label.0, [0.5, 0.0, 1.0]);

        let running = labeler.label(FlightState::Running, &snapshots());
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].input.0[0], 0.3);
        assert_eq!(running[0].label.0, [1.0, 0.8, 0.0]);
    }

    #[test]
    fn missing_snapshot_becomes_zero_vector() {
        let labeler = CrashLabeler::new(Vectorizer::default());
        let examples = labeler.label(FlightState::Running, &Snapshots::default());
        assert_eq!(examples[0].input, FeatureVector::ZERO);
    }
}

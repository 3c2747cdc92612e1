//! Manual override recorder

use dino_rl_core::{Action, ActionLabel, FrameContext, Vectorizer};

use crate::buffer::{Example, ExperienceBuffer};

/// Records a human-supplied action as a one-hot supervised example.
///
/// The input comes from the live frame context, not from the agent's cached
/// snapshots.
#[derive(Debug, Clone, Copy)]
pub struct ManualOverrideRecorder {
    vectorizer: Vectorizer,
}

impl ManualOverrideRecorder {
    /// Create a recorder
    #[must_use]
    pub fn new(vectorizer: Vectorizer) -> Self {
        Self { vectorizer }
    }

    /// Example for `action` in `ctx`; `None` when no obstacle is in view
    #[must_use]
    pub fn example(&self, action: Action, ctx: &FrameContext) -> Option<Example> {
        let state = ctx.state()?;
        Some(Example::new(
            self.vectorizer.vectorize(Some(&state)),
            ActionLabel::one_hot(action),
        ))
    }

    /// Append the override to `buffer`; returns whether anything was added
    pub fn record(&self, action: Action, ctx: &FrameContext, buffer: &mut ExperienceBuffer) -> bool {
        match self.example(action, ctx) {
            Some(example) => {
                buffer.push(example);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dino_rl_core::{FeatureVector, FlightState, Obstacle};

    fn ctx_with_obstacle() -> FrameContext {
        FrameContext {
            flight: FlightState::Running,
            obstacle: Some(Obstacle { x: 300.0, y: 75.0, width: 30.0 }),
            speed: 50.0,
        }
    }

    #[test]
    fn no_obstacle_is_a_no_op() {
        let recorder = ManualOverrideRecorder::new(Vectorizer::default());
        let mut buffer = ExperienceBuffer::default();
        let ctx = FrameContext {
            speed: 12.0,
            ..FrameContext::default()
        };

        assert!(!recorder.record(Action::Jump, &ctx, &mut buffer));
        assert!(buffer.is_empty());
    }

    #[test]
    fn jump_override_appends_one_hot() {
        let recorder = ManualOverrideRecorder::new(Vectorizer::default());
        let mut buffer = ExperienceBuffer::default();

        assert!(recorder.record(Action::Jump, &ctx_with_obstacle(), &mut buffer));
        let example = buffer.get(0).unwrap();
        assert_eq!(example.label.0, [1.0, 0.0, 0.0]);
        assert_eq!(example.input, FeatureVector([0.5, 0.5, 0.05, 0.5]));
    }

    #[test]
    fn duck_and_run_overrides() {
        let recorder = ManualOverrideRecorder::new(Vectorizer::default());
        let duck = recorder.example(Action::Duck, &ctx_with_obstacle()).unwrap();
        let run = recorder.example(Action::Run, &ctx_with_obstacle()).unwrap();
        assert_eq!(duck.label.0, [0.0, 1.0, 0.0]);
        assert_eq!(run.label.0, [0.0, 0.0, 1.0]);
    }
}

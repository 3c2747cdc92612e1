//! Scripted stand-in for a human pressing keys

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dino_rl_core::{Action, FrameContext};

/// Something that may override the policy on a given frame
pub trait Coach: Send {
    /// Action to force this frame, if any
    fn advise(&mut self, ctx: &FrameContext) -> Option<Action>;
}

/// Presses the obvious key when an obstacle is close.
///
/// Obstacles whose top is above `duck_line` are ducked under, everything
/// else is jumped. Only acts on a `rate` fraction of eligible frames.
#[derive(Debug)]
pub struct HeuristicCoach {
    rate: f64,
    reaction_distance: f64,
    duck_line: f64,
    dino_x: f64,
    rng: StdRng,
}

impl HeuristicCoach {
    /// Create a coach for the default runner geometry
    #[must_use]
    pub fn new(rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rate: rate.clamp(0.0, 1.0),
            reaction_distance: 120.0,
            duck_line: 93.0,
            dino_x: 50.0,
            rng,
        }
    }

    /// Distance ahead of the dino within which the coach reacts
    #[must_use]
    pub fn with_reaction_distance(mut self, distance: f64) -> Self {
        self.reaction_distance = distance;
        self
    }

    /// Obstacle tops above this line (smaller `y`) are ducked under
    #[must_use]
    pub fn with_duck_line(mut self, y: f64) -> Self {
        self.duck_line = y;
        self
    }

    /// What the coach would press regardless of its rate
    #[must_use]
    pub fn suggestion(&self, ctx: &FrameContext) -> Option<Action> {
        let obstacle = ctx.obstacle?;
        let distance = obstacle.x - self.dino_x;
        if distance > self.reaction_distance {
            return None;
        }
        if obstacle.y < self.duck_line {
            Some(Action::Duck)
        } else {
            Some(Action::Jump)
        }
    }
}

impl Coach for HeuristicCoach {
    fn advise(&mut self, ctx: &FrameContext) -> Option<Action> {
        let action = self.suggestion(ctx)?;
        self.rng.gen_bool(self.rate).then_some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dino_rl_core::{FlightState, Obstacle};

    fn ctx(x: f64, y: f64) -> FrameContext {
        FrameContext {
            flight: FlightState::Running,
            obstacle: Some(Obstacle { x, y, width: 20.0 }),
            speed: 6.0,
        }
    }

    #[test]
    fn ignores_far_or_missing_obstacles() {
        let coach = HeuristicCoach::new(1.0, Some(1));
        assert_eq!(coach.suggestion(&FrameContext::default()), None);
        assert_eq!(coach.suggestion(&ctx(500.0, 100.0)), None);
    }

    #[test]
    fn jumps_low_and_ducks_high() {
        let coach = HeuristicCoach::new(1.0, Some(1));
        assert_eq!(coach.suggestion(&ctx(120.0, 100.0)), Some(Action::Jump));
        assert_eq!(coach.suggestion(&ctx(120.0, 60.0)), Some(Action::Duck));
    }

    #[test]
    fn zero_rate_never_acts() {
        let mut coach = HeuristicCoach::new(0.0, Some(2));
        for _ in 0..100 {
            assert_eq!(coach.advise(&ctx(100.0, 100.0)), None);
        }
    }

    #[test]
    fn full_rate_always_acts() {
        let mut coach = HeuristicCoach::new(1.0, Some(2)).with_reaction_distance(200.0);
        assert_eq!(coach.advise(&ctx(240.0, 100.0)), Some(Action::Jump));
    }
}

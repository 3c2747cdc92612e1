//! Environment and session configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use dino_rl_core::{LearnerConfig, RLError, Result};

/// Physics and spawning constants of the runner game.
///
/// Units are canvas pixels and frames; `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Ground line (bottom of the dino)
    pub ground_y: f64,
    /// Horizontal position of the dino's left edge
    pub dino_x: f64,
    /// Standing hitbox
    pub dino_width: f64,
    /// Standing height
    pub dino_height: f64,
    /// Ducking hitbox width
    pub duck_width: f64,
    /// Ducking height
    pub duck_height: f64,
    /// Upward take-off speed
    pub jump_velocity: f64,
    /// Downward acceleration per frame
    pub gravity: f64,
    /// Extra gravity while ducking in the air
    pub fast_fall_gravity: f64,
    /// Scroll speed at episode start
    pub initial_speed: f64,
    /// Speed cap
    pub max_speed: f64,
    /// Speed gained per frame
    pub acceleration: f64,
    /// Mean distance between obstacles
    pub mean_gap: f64,
    /// Spread of the obstacle distance
    pub gap_std_dev: f64,
    /// Smallest allowed distance between obstacles
    pub min_gap: f64,
    /// Chance that a spawned obstacle is a bird once birds are allowed
    pub bird_probability: f64,
    /// Speed from which birds start appearing
    pub bird_min_speed: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 150.0,
            ground_y: 140.0,
            dino_x: 50.0,
            dino_width: 40.0,
            dino_height: 43.0,
            duck_width: 55.0,
            duck_height: 25.0,
            jump_velocity: 10.0,
            gravity: 0.6,
            fast_fall_gravity: 1.8,
            initial_speed: 6.0,
            max_speed: 13.0,
            acceleration: 0.001,
            mean_gap: 320.0,
            gap_std_dev: 90.0,
            min_gap: 180.0,
            bird_probability: 0.3,
            bird_min_speed: 8.5,
        }
    }
}

impl RunnerConfig {
    /// Reject values that make the simulation meaningless
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("dino_width", self.dino_width),
            ("dino_height", self.dino_height),
            ("duck_width", self.duck_width),
            ("duck_height", self.duck_height),
            ("jump_velocity", self.jump_velocity),
            ("gravity", self.gravity),
            ("initial_speed", self.initial_speed),
            ("min_gap", self.min_gap),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| v.is_nan() || *v <= 0.0) {
            return Err(RLError::Config(format!("runner.{name} must be positive")));
        }
        if self.ground_y <= self.dino_height || self.ground_y > self.height {
            return Err(RLError::Config("runner.ground_y must lie inside the canvas".into()));
        }
        if self.max_speed < self.initial_speed {
            return Err(RLError::Config("runner.max_speed is below initial_speed".into()));
        }
        if self.gap_std_dev < 0.0 {
            return Err(RLError::Config("runner.gap_std_dev must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.bird_probability) {
            return Err(RLError::Config("runner.bird_probability must lie in [0, 1]".into()));
        }
        Ok(())
    }
}

/// Everything a training session reads from its TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Learning loop settings
    pub learner: LearnerConfig,
    /// Game settings
    pub runner: RunnerConfig,
    /// Episode loop settings
    pub session: SessionSettings,
}

/// Episode loop settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Episodes to play
    pub episodes: usize,
    /// Frame cap per episode; reaching it ends the episode without a crash
    pub max_frames: usize,
    /// Chance per frame that the scripted coach overrides the policy
    pub coach_rate: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            episodes: 20,
            max_frames: 5_000,
            coach_rate: 0.0,
        }
    }
}

impl SessionConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading session config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.learner.validate()?;
        self.runner.validate()?;
        if self.session.max_frames == 0 {
            return Err(RLError::Config("session.max_frames must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.session.coach_rate) {
            return Err(RLError::Config("session.coach_rate must lie in [0, 1]".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dino_rl_core::StalePolicy;

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config = SessionConfig::from_toml_str(
            r#"
            [learner]
            resample_probability = 0.2
            stale_policy = "apply_all"

            [runner]
            initial_speed = 7.0

            [session]
            episodes = 3
            coach_rate = 0.05
            "#,
        )
        .unwrap();

        assert_eq!(config.learner.resample_probability, 0.2);
        assert_eq!(config.learner.stale_policy, StalePolicy::ApplyAll);
        assert_eq!(config.runner.initial_speed, 7.0);
        assert_eq!(config.runner.width, 600.0);
        assert_eq!(config.session.episodes, 3);
        assert_eq!(config.session.max_frames, 5_000);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = SessionConfig::default();
        config.runner.gravity = 0.0;
        assert!(matches!(config.validate(), Err(RLError::Config(_))));

        let mut config = SessionConfig::default();
        config.session.coach_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.runner.max_speed = 1.0;
        assert!(config.validate().is_err());
    }
}

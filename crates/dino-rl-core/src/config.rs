//! Learner configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Architecture, CompileOptions, RLError, TrainOptions};

/// Canvas geometry and speed scale used to normalize raw state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels
    pub width: f64,
    /// Canvas height in pixels
    pub height: f64,
    /// Speed divisor
    pub speed_scale: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 150.0,
            speed_scale: 100.0,
        }
    }
}

/// What to do with a prediction that resolves after its episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Apply every resolution in completion order, even across episodes
    ApplyAll,
    /// Apply only resolutions issued during the agent's current episode
    #[default]
    CurrentEpisode,
}

/// How much experience the buffer keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferRetention {
    /// Keep every example for the life of the agent
    #[default]
    Unbounded,
    /// Keep only the most recent `n` examples
    Window(usize),
}

/// Configuration for the lifecycle controller and its agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Normalization constants
    pub canvas: CanvasConfig,
    /// Per-frame chance of re-asking the oracle while airborne or ducking
    pub resample_probability: f64,
    /// Handling of cross-episode resolutions
    pub stale_policy: StalePolicy,
    /// Buffer growth policy
    pub retention: BufferRetention,
    /// Oracle shape
    pub architecture: Architecture,
    /// Oracle compile options
    pub compile: CompileOptions,
    /// Per-reset training options
    pub train: TrainOptions,
    /// Seed for the sampling gate and oracle initialization
    pub seed: Option<u64>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            resample_probability: 0.1,
            stale_policy: StalePolicy::default(),
            retention: BufferRetention::default(),
            architecture: Architecture::default(),
            compile: CompileOptions::default(),
            train: TrainOptions::default(),
            seed: None,
        }
    }
}

impl LearnerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), ?config, "loaded learner config");
        Ok(config)
    }

    /// Reject values the learning loop cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let canvas = &self.canvas;
        if !(canvas.width > 0.0 && canvas.height > 0.0 && canvas.speed_scale > 0.0) {
            return Err(RLError::Config(format!(
                "canvas dimensions and speed scale must be positive, got {}x{} / {}",
                canvas.width, canvas.height, canvas.speed_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.resample_probability) {
            return Err(RLError::Config(format!(
                "resample_probability must lie in [0, 1], got {}",
                self.resample_probability
            )));
        }
        if self.retention == BufferRetention::Window(0) {
            return Err(RLError::Config("retention window must be non-zero".into()));
        }
        if self.compile.learning_rate <= 0.0 {
            return Err(RLError::Config(format!(
                "learning_rate must be positive, got {}",
                self.compile.learning_rate
            )));
        }
        if self.train.epochs == 0 || self.train.batch_size == 0 {
            return Err(RLError::Config("train epochs and batch_size must be non-zero".into()));
        }
        let arch = &self.architecture;
        if arch.input_size != crate::FEATURE_DIM {
            return Err(RLError::DimensionMismatch {
                expected: crate::FEATURE_DIM,
                actual: arch.input_size,
            });
        }
        if arch.output.units != crate::ACTION_DIM {
            return Err(RLError::DimensionMismatch {
                expected: crate::ACTION_DIM,
                actual: arch.output.units,
            });
        }
        if arch.hidden.units == 0 {
            return Err(RLError::Config("hidden layer needs at least one unit".into()));
        }
        Ok(())
    }
}

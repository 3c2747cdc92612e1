//! Raw environment signals and the feature vector the oracle consumes

use serde::{Deserialize, Serialize};

use crate::{FlightState, RLError};

/// Length of a [`FeatureVector`]
pub const FEATURE_DIM: usize = 4;

/// Nearest obstacle as the environment reports it, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
}

/// Environment snapshot used for a decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// Obstacle left edge
    pub obstacle_x: f64,
    /// Obstacle top edge
    pub obstacle_y: f64,
    /// Obstacle width
    pub obstacle_width: f64,
    /// Current scroll speed
    pub speed: f64,
}

impl EnvironmentState {
    /// Combine an obstacle with the current speed
    #[must_use]
    pub fn from_obstacle(obstacle: &Obstacle, speed: f64) -> Self {
        Self {
            obstacle_x: obstacle.x,
            obstacle_y: obstacle.y,
            obstacle_width: obstacle.width,
            speed,
        }
    }
}

/// Everything a lifecycle hook may read about the running game.
///
/// Passed explicitly into every hook; nothing in the learning loop reaches
/// for a process-wide runner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameContext {
    /// The agent's body state this frame
    pub flight: FlightState,
    /// Nearest obstacle in view, if any
    pub obstacle: Option<Obstacle>,
    /// Current scroll speed
    pub speed: f64,
}

impl FrameContext {
    /// Decision state for this frame; absent when no obstacle is in view
    #[must_use]
    pub fn state(&self) -> Option<EnvironmentState> {
        self.obstacle
            .as_ref()
            .map(|obstacle| EnvironmentState::from_obstacle(obstacle, self.speed))
    }
}

/// Normalized four-component oracle input
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    /// All-zero vector, used when nothing is in view
    pub const ZERO: Self = Self([0.0; FEATURE_DIM]);

    /// Raw components
    #[must_use]
    pub fn as_array(&self) -> &[f64; FEATURE_DIM] {
        &self.0
    }

    /// Build from a slice, checking its length
    pub fn from_slice(values: &[f64]) -> crate::Result<Self> {
        let array: [f64; FEATURE_DIM] = values.try_into().map_err(|_| RLError::DimensionMismatch {
            expected: FEATURE_DIM,
            actual: values.len(),
        })?;
        Ok(Self(array))
    }
}

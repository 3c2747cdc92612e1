//! Discrete actions, action labels and the agent's flight state

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RLError;

/// Number of action slots in a label or score vector
pub const ACTION_DIM: usize = 3;

/// Discrete action returned to the environment each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    /// Leave the ground (`1`)
    Jump,
    /// Lower the body (`-1`)
    Duck,
    /// Keep running (`0`)
    #[default]
    Run,
}

impl Action {
    /// Wire code the environment understands
    #[must_use]
    pub fn code(self) -> i8 {
        match self {
            Self::Jump => 1,
            Self::Duck => -1,
            Self::Run => 0,
        }
    }

    /// Slot of this action inside an [`ActionLabel`]
    #[must_use]
    pub fn slot(self) -> usize {
        match self {
            Self::Jump => 0,
            Self::Duck => 1,
            Self::Run => 2,
        }
    }
}

impl TryFrom<i8> for Action {
    type Error = RLError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Jump),
            -1 => Ok(Self::Duck),
            0 => Ok(Self::Run),
            other => Err(RLError::Agent(format!("invalid action code {other}"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jump => "jump",
            Self::Duck => "duck",
            Self::Run => "run",
        };
        f.write_str(name)
    }
}

/// Three-slot training target `{Jump, Duck, Run}`; soft values allowed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionLabel(pub [f64; ACTION_DIM]);

/// Oracle output shares the label layout
pub type Scores = ActionLabel;

impl ActionLabel {
    /// Label with a single slot set to 1
    #[must_use]
    pub fn one_hot(action: Action) -> Self {
        let mut values = [0.0; ACTION_DIM];
        values[action.slot()] = 1.0;
        Self(values)
    }

    /// Raw slot values
    #[must_use]
    pub fn as_array(&self) -> &[f64; ACTION_DIM] {
        &self.0
    }

    /// Build from a slice, checking its length
    pub fn from_slice(values: &[f64]) -> crate::Result<Self> {
        let array: [f64; ACTION_DIM] = values.try_into().map_err(|_| RLError::DimensionMismatch {
            expected: ACTION_DIM,
            actual: values.len(),
        })?;
        Ok(Self(array))
    }
}

impl From<[f64; ACTION_DIM]> for ActionLabel {
    fn from(values: [f64; ACTION_DIM]) -> Self {
        Self(values)
    }
}

/// What the agent's body is doing, as reported by the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlightState {
    /// On the ground and upright
    #[default]
    Running,
    /// Airborne
    Jumping,
    /// Ducking
    Ducking,
}

impl FlightState {
    /// Collapse the environment's two flags; `jumping` wins if both are set.
    #[must_use]
    pub fn from_flags(jumping: bool, ducking: bool) -> Self {
        match (jumping, ducking) {
            (true, _) => Self::Jumping,
            (false, true) => Self::Ducking,
            (false, false) => Self::Running,
        }
    }

    /// `jumping` flag
    #[must_use]
    pub fn is_jumping(self) -> bool {
        self == Self::Jumping
    }

    /// `ducking` flag
    #[must_use]
    pub fn is_ducking(self) -> bool {
        self == Self::Ducking
    }
}

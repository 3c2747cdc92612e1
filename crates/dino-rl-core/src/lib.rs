//! Core types for the dino-rl learning loop
//!
//! This crate holds the pieces every other dino-rl crate agrees on: the
//! discrete actions and label layout, the raw environment state and its
//! normalized feature vector, the oracle contract, configuration and errors.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod error;
pub mod observation;
pub mod oracle;
pub mod vectorizer;

// Re-export core traits and types
pub use action::{Action, ActionLabel, FlightState, Scores, ACTION_DIM};
pub use config::{BufferRetention, CanvasConfig, LearnerConfig, StalePolicy};
pub use error::{RLError, Result};
pub use observation::{EnvironmentState, FeatureVector, FrameContext, Obstacle, FEATURE_DIM};
pub use oracle::{
    Activation, Architecture, CompileOptions, LayerSpec, Loss, Optimizer, Oracle, OracleFactory,
    TrainOptions, TrainReport,
};
pub use vectorizer::Vectorizer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionLabel, EnvironmentState, FeatureVector, FlightState, FrameContext,
        LearnerConfig, Obstacle, Oracle, OracleFactory, Result, RLError, Scores, Vectorizer,
    };
}

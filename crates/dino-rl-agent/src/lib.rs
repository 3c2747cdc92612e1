//! Learning-loop agent for the dino runner
//!
//! This crate provides the pieces that sit between the game and the oracle:
//! - The action policy and its sampling gate
//! - The experience buffer and crash labeler
//! - The manual override recorder
//! - The episode lifecycle controller that wires them to environment hooks
//! - A small ndarray MLP used as the default oracle

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod buffer;
pub mod controller;
pub mod decision;
pub mod labels;
pub mod network;
pub mod policy;
pub mod recorder;

// Re-export the controller surface
pub use agent::{AgentId, AgentRecord, AgentStats, Phase, Snapshots};
pub use controller::LifecycleController;
pub use decision::{Decision, Resolution};

// Re-export learning components
pub use buffer::{Example, ExperienceBuffer};
pub use labels::{CrashLabeler, CrashOutcome, CRASH_LABELS};
pub use policy::ActionPolicy;
pub use recorder::ManualOverrideRecorder;

// Re-export the default oracle
pub use network::{MlpOracle, MlpOracleFactory};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AgentId, AgentStats, Decision, Example, ExperienceBuffer, LifecycleController,
        MlpOracleFactory, Phase, Resolution, Snapshots,
    };
    pub use dino_rl_core::prelude::*;
}

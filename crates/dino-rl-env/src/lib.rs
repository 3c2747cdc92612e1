//! Headless runner game and training session for dino-rl
//!
//! This crate provides:
//! - A side-scrolling runner simulation producing frame contexts
//! - A scripted coach standing in for a human at the keyboard
//! - The frame loop that drives the lifecycle controller
//! - Session configuration loaded from TOML

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coach;
pub mod config;
pub mod game;
pub mod runner;

// Re-export the game
pub use game::{FrameOutcome, Hazard, ObstacleKind, RunnerEnv};

// Re-export the session pieces
pub use coach::{Coach, HeuristicCoach};
pub use config::{RunnerConfig, SessionConfig, SessionSettings};
pub use runner::{EpisodeSummary, Runner, SessionSummary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Coach, EpisodeSummary, HeuristicCoach, Runner, RunnerConfig, RunnerEnv, SessionConfig,
        SessionSummary,
    };
    pub use dino_rl_agent::prelude::*;
}

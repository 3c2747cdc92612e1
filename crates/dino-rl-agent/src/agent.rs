//! The agent record the lifecycle controller keeps per controlled entity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use dino_rl_core::{BufferRetention, EnvironmentState, FlightState, Oracle, Scores};

use crate::buffer::ExperienceBuffer;

/// Index of an agent in the controller's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Lifecycle phase of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Registered, no oracle yet
    #[default]
    Uninitialized,
    /// Reset done, waiting for the first frame
    Ready,
    /// Receiving frames
    Running,
    /// Crashed; the next reset retrains
    Crashed,
}

/// "Last state before action" snapshots plus the latest prediction.
///
/// Written by prediction resolutions, read by the crash labeler.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshots {
    /// State of the last resolution that chose Jump
    pub last_jumping_state: Option<EnvironmentState>,
    /// State of the last resolution that chose Duck
    pub last_ducking_state: Option<EnvironmentState>,
    /// State of the last resolution that chose Run
    pub last_running_state: Option<EnvironmentState>,
    /// State of the last resolution, whatever it chose
    pub last_state: Option<EnvironmentState>,
    /// Scores of the last resolution
    pub last_prediction: Option<Scores>,
}

/// Counters reported by [`crate::LifecycleController::stats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Completed resets
    pub episodes: u64,
    /// Frames seen while running
    pub frames: u64,
    /// Predictions handed to the oracle
    pub predictions_issued: u64,
    /// Resolutions written to the snapshots
    pub predictions_applied: u64,
    /// Resolutions dropped because their episode had ended
    pub predictions_discarded: u64,
    /// Crashes labeled
    pub crashes: u64,
    /// Manual overrides recorded
    pub overrides: u64,
    /// Completed training runs
    pub trainings: u64,
    /// Current buffer length
    pub buffer_len: usize,
    /// Loss reported by the latest training run
    pub last_loss: Option<f64>,
}

/// State shared with in-flight prediction tasks
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    /// Episode generation token; bumped on every successful reset
    pub generation: u64,
    pub snapshots: Snapshots,
    pub applied: u64,
    pub discarded: u64,
}

pub(crate) type SharedOracle = Arc<dyn Oracle>;

/// Everything the controller tracks for one agent
pub struct AgentRecord {
    pub(crate) id: AgentId,
    pub(crate) phase: Phase,
    pub(crate) flight: FlightState,
    pub(crate) oracle: Option<SharedOracle>,
    pub(crate) buffer: ExperienceBuffer,
    pub(crate) shared: Arc<Mutex<SharedState>>,
    pub(crate) stats: AgentStats,
}

impl AgentRecord {
    pub(crate) fn new(id: AgentId, retention: BufferRetention) -> Self {
        Self {
            id,
            phase: Phase::Uninitialized,
            flight: FlightState::Running,
            oracle: None,
            buffer: ExperienceBuffer::new(retention),
            shared: Arc::new(Mutex::new(SharedState::default())),
            stats: AgentStats::default(),
        }
    }

    /// Agent id
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Flight state reported by the last hook
    #[must_use]
    pub fn flight(&self) -> FlightState {
        self.flight
    }

    /// Accumulated experience
    #[must_use]
    pub fn buffer(&self) -> &ExperienceBuffer {
        &self.buffer
    }

    /// Whether the oracle has been constructed
    #[must_use]
    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }
}

impl fmt::Debug for AgentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRecord")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("flight", &self.flight)
            .field("has_oracle", &self.oracle.is_some())
            .field("buffer_len", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

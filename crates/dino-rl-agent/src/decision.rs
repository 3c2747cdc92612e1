//! Per-frame decisions handed back to the environment

use tokio::task::JoinHandle;

use dino_rl_core::{Action, RLError, Result};

/// How an issued decision ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The sampling gate was closed; the oracle was not consulted
    Skipped,
    /// The oracle answered and the agent's snapshots were updated
    Applied(Action),
    /// The oracle answered after the issuing episode ended; nothing written
    Discarded {
        /// Generation the request was issued in
        issued: u64,
        /// Agent's generation when it resolved
        current: u64,
    },
}

impl Resolution {
    /// Action for the environment; only an applied resolution moves the agent
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            Self::Applied(action) => *action,
            Self::Skipped | Self::Discarded { .. } => Action::Run,
        }
    }
}

/// Action slot for one frame.
///
/// A skipped frame is resolved immediately. A sampled frame owns the spawned
/// prediction task; the environment may await it or poll
/// [`Decision::is_resolved`] on later frames.
#[derive(Debug)]
pub enum Decision {
    /// Gate closed, resolves to Run
    Skipped,
    /// Prediction in flight
    Pending {
        /// Episode generation the request carries
        generation: u64,
        /// Task resolving the prediction
        handle: JoinHandle<Result<Resolution>>,
    },
}

impl Decision {
    /// Whether awaiting would complete without suspending
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Skipped => true,
            Self::Pending { handle, .. } => handle.is_finished(),
        }
    }

    /// Whether the oracle was consulted for this frame
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Wait for the full resolution
    pub async fn resolve(self) -> Result<Resolution> {
        match self {
            Self::Skipped => Ok(Resolution::Skipped),
            Self::Pending { handle, .. } => handle
                .await
                .map_err(|e| RLError::oracle(format!("prediction task failed: {e}")))?,
        }
    }

    /// Wait for the action to hand to the environment
    pub async fn action(self) -> Result<Action> {
        Ok(self.resolve().await?.action())
    }
}

//! Frame loop driving the lifecycle hooks from the runner game

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dino_rl_agent::{AgentId, AgentStats, Decision, LifecycleController, Resolution};
use dino_rl_core::{FrameContext, Result};

use crate::coach::{Coach, HeuristicCoach};
use crate::config::SessionConfig;
use crate::game::RunnerEnv;

/// What happened in one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Unique episode id
    pub id: Uuid,
    /// Episode number, starting at 1
    pub episode: usize,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end
    pub finished_at: DateTime<Utc>,
    /// Frames survived
    pub frames: usize,
    /// Obstacles cleared
    pub obstacles_passed: usize,
    /// Ended by a collision rather than the frame cap
    pub crashed: bool,
    /// Scroll speed when the episode ended
    pub final_speed: f64,
    /// Frames on which the oracle was consulted
    pub predictions: usize,
    /// Predictions whose action reached the game
    pub applied: usize,
    /// Predictions dropped because they belonged to an older episode
    pub discarded: usize,
    /// Predictions the oracle rejected
    pub oracle_failures: usize,
    /// Coach key presses recorded as examples
    pub overrides: usize,
    /// Experience buffer length at the end of the episode
    pub buffer_len: usize,
}

/// Aggregate over a whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Per-episode results, in order
    pub episodes: Vec<EpisodeSummary>,
    /// Agent counters at the end of the session
    pub stats: AgentStats,
    /// Longest episode in frames
    pub best_frames: usize,
    /// Mean episode length in frames
    pub mean_frames: f64,
}

#[derive(Debug, Default)]
struct Tally {
    predictions: usize,
    applied: usize,
    discarded: usize,
    oracle_failures: usize,
    overrides: usize,
}

/// Plays episodes of [`RunnerEnv`] through a [`LifecycleController`].
///
/// Each frame: the coach may press a key, the controller decides, finished
/// predictions are applied to the game in issue order, then the game
/// advances. Frames where the controller skips sampling leave the last
/// input in force. A prediction
/// still pending when its episode ends is left running; the controller's
/// stale policy decides what it does on completion.
pub struct Runner {
    env: RunnerEnv,
    controller: LifecycleController,
    coach: Option<Box<dyn Coach>>,
    agent: AgentId,
    max_frames: usize,
    episodes_played: usize,
}

impl Runner {
    /// Wire a controller to a game; registers one agent
    pub fn new(env: RunnerEnv, mut controller: LifecycleController) -> Self {
        let agent = controller.register_agent();
        Self {
            env,
            controller,
            coach: None,
            agent,
            max_frames: 5_000,
            episodes_played: 0,
        }
    }

    /// Build everything a session file describes, with the MLP oracle
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let canvas = config.learner.canvas;
        if canvas.width != config.runner.width || canvas.height != config.runner.height {
            warn!(
                learner = ?(canvas.width, canvas.height),
                runner = ?(config.runner.width, config.runner.height),
                "learner canvas differs from the game canvas"
            );
        }

        let env = RunnerEnv::new(config.runner, config.learner.seed)?;
        let controller = LifecycleController::with_mlp(config.learner.clone())?;
        let mut runner = Self::new(env, controller).with_max_frames(config.session.max_frames);

        if config.session.coach_rate > 0.0 {
            let seed = config.learner.seed.map(|s| s.wrapping_add(1));
            runner = runner.with_coach(Box::new(HeuristicCoach::new(config.session.coach_rate, seed)));
        }
        Ok(runner)
    }

    /// Let a coach override the policy
    #[must_use]
    pub fn with_coach(mut self, coach: Box<dyn Coach>) -> Self {
        self.coach = Some(coach);
        self
    }

    /// Cap episode length
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames.max(1);
        self
    }

    /// The agent being trained
    #[must_use]
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    /// The controller
    #[must_use]
    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// The game
    #[must_use]
    pub fn env(&self) -> &RunnerEnv {
        &self.env
    }

    /// Play one episode: reset, frame loop, crash or frame cap
    pub async fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let started_at = Utc::now();
        let id = Uuid::new_v4();
        self.episodes_played += 1;

        self.controller.on_reset(&[self.agent]).await?;
        let mut ctx = self.env.reset();
        let mut pending: Vec<Decision> = Vec::new();
        let mut tally = Tally::default();
        let mut crashed = false;

        while self.env.frames() < self.max_frames {
            self.coach_frame(&ctx, &mut tally)?;

            // A skipped frame leaves the controls as they are
            let decision = self.controller.on_running(self.agent, &ctx).await?;
            if decision.is_pending() {
                tally.predictions += 1;
                pending.push(decision);
            }

            // Let prediction tasks run before reading the action slots
            tokio::task::yield_now().await;
            self.apply_finished(&mut pending, &mut tally).await;

            let outcome = self.env.step()?;
            ctx = outcome.context;
            if outcome.crashed {
                self.controller.on_crash(self.agent, &ctx).await?;
                crashed = true;
                break;
            }
        }

        let summary = EpisodeSummary {
            id,
            episode: self.episodes_played,
            started_at,
            finished_at: Utc::now(),
            frames: self.env.frames(),
            obstacles_passed: self.env.passed(),
            crashed,
            final_speed: self.env.speed(),
            predictions: tally.predictions,
            applied: tally.applied,
            discarded: tally.discarded,
            oracle_failures: tally.oracle_failures,
            overrides: tally.overrides,
            buffer_len: self
                .controller
                .agent(self.agent)
                .map_or(0, |agent| agent.buffer().len()),
        };

        info!(
            episode = summary.episode,
            frames = summary.frames,
            passed = summary.obstacles_passed,
            crashed = summary.crashed,
            buffer = summary.buffer_len,
            "episode finished"
        );
        Ok(summary)
    }

    /// Play `episodes` episodes
    pub async fn run(&mut self, episodes: usize) -> Result<SessionSummary> {
        let mut summaries = Vec::with_capacity(episodes);
        for _ in 0..episodes {
            summaries.push(self.run_episode().await?);
        }

        let best_frames = summaries.iter().map(|s| s.frames).max().unwrap_or(0);
        let mean_frames = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.frames as f64).sum::<f64>() / summaries.len() as f64
        };

        Ok(SessionSummary {
            stats: self.controller.stats(self.agent).await?,
            episodes: summaries,
            best_frames,
            mean_frames,
        })
    }

    fn coach_frame(&mut self, ctx: &FrameContext, tally: &mut Tally) -> Result<()> {
        let Some(action) = self.coach.as_mut().and_then(|coach| coach.advise(ctx)) else {
            return Ok(());
        };
        if self.controller.on_key(self.agent, action, ctx)? {
            tally.overrides += 1;
        }
        self.env.apply(action);
        Ok(())
    }

    /// Apply every prediction that has completed, in issue order.
    ///
    /// Only applied predictions reach the game. Discarded ones and oracle
    /// failures are counted and the frame loop goes on.
    async fn apply_finished(&mut self, pending: &mut Vec<Decision>, tally: &mut Tally) {
        let mut i = 0;
        while i < pending.len() {
            if !pending[i].is_resolved() {
                i += 1;
                continue;
            }
            match pending.remove(i).resolve().await {
                Ok(resolution) => {
                    debug!(?resolution, "decision resolved");
                    match resolution {
                        Resolution::Applied(action) => {
                            tally.applied += 1;
                            self.env.apply(action);
                        }
                        Resolution::Discarded { .. } => tally.discarded += 1,
                        Resolution::Skipped => {}
                    }
                }
                Err(e) => {
                    tally.oracle_failures += 1;
                    warn!(error = %e, "prediction failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("agent", &self.agent)
            .field("max_frames", &self.max_frames)
            .field("episodes_played", &self.episodes_played)
            .field("has_coach", &self.coach.is_some())
            .finish_non_exhaustive()
    }
}

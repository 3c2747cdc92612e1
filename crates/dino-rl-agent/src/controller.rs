//! Episode lifecycle controller
//!
//! Owns the agent table and wires the environment hooks to the policy,
//! crash labeler, override recorder and oracle. Every hook takes the frame
//! context explicitly; nothing is read from process-wide state.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use dino_rl_core::{
    Action, FlightState, FrameContext, LearnerConfig, OracleFactory, RLError, Result, StalePolicy,
    Vectorizer,
};

use crate::agent::{AgentId, AgentRecord, AgentStats, Phase, SharedOracle, Snapshots};
use crate::decision::{Decision, Resolution};
use crate::labels::CrashLabeler;
use crate::network::MlpOracleFactory;
use crate::policy::ActionPolicy;
use crate::recorder::ManualOverrideRecorder;

/// Drives agents through reset, per-frame decisions, crash and overrides
pub struct LifecycleController {
    config: LearnerConfig,
    vectorizer: Vectorizer,
    policy: ActionPolicy,
    labeler: CrashLabeler,
    recorder: ManualOverrideRecorder,
    factory: Box<dyn OracleFactory>,
    agents: IndexMap<AgentId, AgentRecord>,
    rng: StdRng,
    next_id: usize,
}

fn lookup(agents: &mut IndexMap<AgentId, AgentRecord>, id: AgentId) -> Result<&mut AgentRecord> {
    agents.get_mut(&id).ok_or(RLError::UnknownAgent(id.0))
}

impl LifecycleController {
    /// Create a controller building oracles through `factory`
    pub fn new(config: LearnerConfig, factory: Box<dyn OracleFactory>) -> Result<Self> {
        config.validate()?;

        let vectorizer = Vectorizer::new(config.canvas);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            vectorizer,
            policy: ActionPolicy::new(config.resample_probability),
            labeler: CrashLabeler::new(vectorizer),
            recorder: ManualOverrideRecorder::new(vectorizer),
            factory,
            agents: IndexMap::new(),
            rng,
            next_id: 0,
            config,
        })
    }

    /// Create a controller backed by the built-in MLP oracle
    pub fn with_mlp(config: LearnerConfig) -> Result<Self> {
        let factory = MlpOracleFactory::new(config.train, config.seed);
        Self::new(config, Box::new(factory))
    }

    /// Add an agent; its buffer exists from now on, its oracle from the first reset
    pub fn register_agent(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.agents
            .insert(id, AgentRecord::new(id, self.config.retention));
        debug!(agent = %id, "registered agent");
        id
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Vectorizer shared by the labeler and recorder
    #[must_use]
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Registered agent ids, in registration order
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    /// Read-only view of an agent
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        self.agents.get(&id)
    }

    /// Current snapshots of an agent
    pub async fn snapshots(&self, id: AgentId) -> Result<Snapshots> {
        let record = self.agents.get(&id).ok_or(RLError::UnknownAgent(id.0))?;
        let snapshots = record.shared.lock().await.snapshots;
        Ok(snapshots)
    }

    /// Episode generation token of an agent
    pub async fn generation(&self, id: AgentId) -> Result<u64> {
        let record = self.agents.get(&id).ok_or(RLError::UnknownAgent(id.0))?;
        let generation = record.shared.lock().await.generation;
        Ok(generation)
    }

    /// Counters for an agent
    pub async fn stats(&self, id: AgentId) -> Result<AgentStats> {
        let record = self.agents.get(&id).ok_or(RLError::UnknownAgent(id.0))?;
        let shared = record.shared.lock().await;
        Ok(AgentStats {
            predictions_applied: shared.applied,
            predictions_discarded: shared.discarded,
            buffer_len: record.buffer.len(),
            ..record.stats.clone()
        })
    }

    /// Episode start for the first agent in `agents`.
    ///
    /// The first reset builds the oracle. Later resets train it on the whole
    /// buffer before returning. A failed training leaves the agent exactly as
    /// it was so the next reset retries.
    pub async fn on_reset(&mut self, agents: &[AgentId]) -> Result<()> {
        let id = *agents
            .first()
            .ok_or_else(|| RLError::Agent("reset called with no agents".to_string()))?;
        let record = lookup(&mut self.agents, id)?;

        if let Some(oracle) = record.oracle.clone() {
            let (inputs, labels) = record.buffer.training_set();
            let report = match oracle.train(inputs, labels).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(agent = %id, error = %e, "training failed");
                    return Err(e);
                }
            };
            record.stats.trainings += 1;
            record.stats.last_loss = report.loss;
            info!(
                agent = %id,
                examples = report.examples,
                loss = ?report.loss,
                "oracle trained"
            );
        } else {
            let oracle = self
                .factory
                .initialize(&self.config.architecture, &self.config.compile)?;
            record.oracle = Some(Arc::from(oracle));
            info!(agent = %id, "oracle initialized");
        }

        let mut shared = record.shared.lock().await;
        shared.generation += 1;
        shared.snapshots = Snapshots::default();
        let generation = shared.generation;
        drop(shared);

        record.flight = FlightState::Running;
        record.phase = Phase::Ready;
        record.stats.episodes += 1;
        info!(agent = %id, generation, buffer = record.buffer.len(), "episode started");
        Ok(())
    }

    /// One frame while playing.
    ///
    /// Returns immediately. When the sampling gate opens the prediction runs
    /// on a spawned task and the returned [`Decision`] resolves once it
    /// completes.
    pub async fn on_running(&mut self, id: AgentId, ctx: &FrameContext) -> Result<Decision> {
        let record = lookup(&mut self.agents, id)?;
        let oracle: SharedOracle = match (&record.oracle, record.phase) {
            (None, _) => {
                return Err(RLError::Agent(format!("{id} received a frame before its first reset")))
            }
            (Some(_), Phase::Crashed) => {
                return Err(RLError::Agent(format!("{id} received a frame after crashing")))
            }
            (Some(oracle), _) => Arc::clone(oracle),
        };

        record.flight = ctx.flight;
        record.phase = Phase::Running;
        record.stats.frames += 1;

        if !self.policy.should_sample(ctx.flight, &mut self.rng) {
            return Ok(Decision::Skipped);
        }

        let state = ctx.state();
        let features = self.vectorizer.vectorize(state.as_ref());
        let shared = Arc::clone(&record.shared);
        let stale_policy = self.config.stale_policy;
        let generation = shared.lock().await.generation;
        record.stats.predictions_issued += 1;

        let handle = tokio::spawn(async move {
            let scores = oracle.predict(&features).await?;

            let mut shared = shared.lock().await;
            if stale_policy == StalePolicy::CurrentEpisode && shared.generation != generation {
                shared.discarded += 1;
                warn!(
                    agent = %id,
                    issued = generation,
                    current = shared.generation,
                    "discarding stale prediction"
                );
                return Ok(Resolution::Discarded {
                    issued: generation,
                    current: shared.generation,
                });
            }

            let action = ActionPolicy::record(&mut shared.snapshots, state, scores);
            shared.applied += 1;
            debug!(agent = %id, ?scores, %action, "prediction applied");
            Ok(Resolution::Applied(action))
        });

        Ok(Decision::Pending { generation, handle })
    }

    /// Collision: label the crash from the cached snapshots and append
    pub async fn on_crash(&mut self, id: AgentId, ctx: &FrameContext) -> Result<()> {
        let record = lookup(&mut self.agents, id)?;
        if record.phase == Phase::Crashed {
            return Err(RLError::Agent(format!("{id} crashed twice in one episode")));
        }

        record.flight = ctx.flight;
        let snapshots = record.shared.lock().await.snapshots;
        let examples = self.labeler.label(ctx.flight, &snapshots);
        let appended = examples.len();
        record.buffer.extend(examples);
        record.phase = Phase::Crashed;
        record.stats.crashes += 1;

        info!(
            agent = %id,
            flight = ?ctx.flight,
            appended,
            buffer = record.buffer.len(),
            "crash labeled"
        );
        Ok(())
    }

    /// Human-supplied action; skipped when no obstacle is in view
    pub fn on_key(&mut self, id: AgentId, action: Action, ctx: &FrameContext) -> Result<bool> {
        let record = lookup(&mut self.agents, id)?;
        let recorded = self.recorder.record(action, ctx, &mut record.buffer);
        if recorded {
            record.stats.overrides += 1;
            debug!(agent = %id, %action, buffer = record.buffer.len(), "override recorded");
        }
        Ok(recorded)
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("policy", &self.policy)
            .field("agents", &self.agents)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dino_rl_core::{
        ActionLabel, Architecture, CompileOptions, FeatureVector, Obstacle, Oracle, Scores,
        TrainReport,
    };

    struct FixedOracle(Scores);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn predict(&self, _features: &FeatureVector) -> Result<Scores> {
            Ok(self.0)
        }

        async fn train(&self, inputs: &[FeatureVector], _labels: &[ActionLabel]) -> Result<TrainReport> {
            Ok(TrainReport {
                examples: inputs.len(),
                epochs: 1,
                loss: None,
            })
        }
    }

    struct FixedFactory(Scores);

    impl OracleFactory for FixedFactory {
        fn initialize(&self, _: &Architecture, _: &CompileOptions) -> Result<Box<dyn Oracle>> {
            Ok(Box::new(FixedOracle(self.0)))
        }
    }

    fn controller(scores: [f64; 3]) -> LifecycleController {
        let config = LearnerConfig {
            seed: Some(7),
            ..LearnerConfig::default()
        };
        LifecycleController::new(config, Box::new(FixedFactory(ActionLabel(scores)))).unwrap()
    }

    fn running_ctx() -> FrameContext {
        FrameContext {
            flight: FlightState::Running,
            obstacle: Some(Obstacle { x: 300.0, y: 75.0, width: 30.0 }),
            speed: 50.0,
        }
    }

    #[tokio::test]
    async fn frame_before_reset_is_an_error() {
        let mut controller = controller([0.9, 0.1, 0.1]);
        let id = controller.register_agent();
        assert!(matches!(
            controller.on_running(id, &running_ctx()).await,
            Err(RLError::Agent(_))
        ));
    }

    #[tokio::test]
    async fn unknown_agent_is_reported() {
        let mut controller = controller([0.9, 0.1, 0.1]);
        assert!(matches!(
            controller.on_reset(&[AgentId(3)]).await,
            Err(RLError::UnknownAgent(3))
        ));
        assert!(matches!(controller.on_reset(&[]).await, Err(RLError::Agent(_))));
    }

    #[tokio::test]
    async fn running_frame_applies_prediction() {
        let mut controller = controller([0.9, 0.1, 0.1]);
        let id = controller.register_agent();
        controller.on_reset(&[id]).await.unwrap();

        let decision = controller.on_running(id, &running_ctx()).await.unwrap();
        assert!(decision.is_pending());
        assert_eq!(decision.action().await.unwrap(), Action::Jump);

        let snapshots = controller.snapshots(id).await.unwrap();
        assert_eq!(snapshots.last_jumping_state, running_ctx().state());
        assert_eq!(snapshots.last_state, running_ctx().state());

        let stats = controller.stats(id).await.unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.predictions_issued, 1);
        assert_eq!(stats.predictions_applied, 1);
    }

    #[tokio::test]
    async fn reset_clears_snapshots_and_bumps_generation() {
        let mut controller = controller([0.1, 0.1, 0.9]);
        let id = controller.register_agent();
        controller.on_reset(&[id]).await.unwrap();
        assert_eq!(controller.generation(id).await.unwrap(), 1);

        controller.on_running(id, &running_ctx()).await.unwrap().resolve().await.unwrap();
        controller.on_crash(id, &running_ctx()).await.unwrap();
        assert_eq!(controller.agent(id).unwrap().phase(), Phase::Crashed);

        controller.on_reset(&[id]).await.unwrap();
        assert_eq!(controller.generation(id).await.unwrap(), 2);
        assert_eq!(controller.snapshots(id).await.unwrap(), Snapshots::default());
        assert_eq!(controller.agent(id).unwrap().phase(), Phase::Ready);
        assert_eq!(controller.agent(id).unwrap().buffer().len(), 1);
    }

    #[tokio::test]
    async fn double_crash_is_rejected() {
        let mut controller = controller([0.1, 0.1, 0.9]);
        let id = controller.register_agent();
        controller.on_reset(&[id]).await.unwrap();
        controller.on_crash(id, &running_ctx()).await.unwrap();
        assert!(controller.on_crash(id, &running_ctx()).await.is_err());
        assert!(controller.on_running(id, &running_ctx()).await.is_err());
        assert_eq!(controller.agent(id).unwrap().buffer().len(), 1);
    }

    #[tokio::test]
    async fn override_counts_only_when_recorded() {
        let mut controller = controller([0.1, 0.1, 0.9]);
        let id = controller.register_agent();

        assert!(!controller.on_key(id, Action::Duck, &FrameContext::default()).unwrap());
        assert!(controller.on_key(id, Action::Duck, &running_ctx()).unwrap());
        assert_eq!(controller.stats(id).await.unwrap().overrides, 1);
        assert_eq!(controller.stats(id).await.unwrap().buffer_len, 1);
    }
}

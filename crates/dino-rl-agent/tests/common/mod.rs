//! Scriptable oracle for lifecycle tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use dino_rl_agent::{AgentId, LifecycleController};
use dino_rl_core::{
    ActionLabel, Architecture, CompileOptions, EnvironmentState, FeatureVector, FlightState,
    FrameContext, LearnerConfig, Obstacle, Oracle, OracleFactory, RLError, Result, Scores,
    StalePolicy, TrainReport,
};

pub const JUMP: [f64; 3] = [0.9, 0.1, 0.2];
pub const DUCK: [f64; 3] = [0.1, 0.9, 0.2];
pub const RUN: [f64; 3] = [0.1, 0.2, 0.9];

struct Script {
    obstacle_x: f64,
    scores: Scores,
    gate: Option<oneshot::Receiver<()>>,
}

/// Observable state shared between a test and every oracle its factory built
pub struct MockState {
    pub predict_calls: AtomicUsize,
    pub train_calls: Mutex<Vec<(usize, usize)>>,
    pub fail_predict: AtomicBool,
    pub fail_train: AtomicBool,
    default_scores: Scores,
    scripts: Mutex<Vec<Script>>,
}

impl MockState {
    pub fn new(default_scores: [f64; 3]) -> Arc<Self> {
        Arc::new(Self {
            predict_calls: AtomicUsize::new(0),
            train_calls: Mutex::new(Vec::new()),
            fail_predict: AtomicBool::new(false),
            fail_train: AtomicBool::new(false),
            default_scores: ActionLabel(default_scores),
            scripts: Mutex::new(Vec::new()),
        })
    }

    /// Answer the next prediction for an obstacle at `obstacle_x` with `scores`
    pub fn script(&self, obstacle_x: f64, scores: [f64; 3]) {
        self.scripts.lock().unwrap().push(Script {
            obstacle_x,
            scores: ActionLabel(scores),
            gate: None,
        });
    }

    /// Like [`MockState::script`], but hold the answer until the sender fires
    pub fn script_gated(&self, obstacle_x: f64, scores: [f64; 3]) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.scripts.lock().unwrap().push(Script {
            obstacle_x,
            scores: ActionLabel(scores),
            gate: Some(rx),
        });
        tx
    }

    pub fn predicts(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn trains(&self) -> Vec<(usize, usize)> {
        self.train_calls.lock().unwrap().clone()
    }
}

pub struct MockOracle {
    state: Arc<MockState>,
}

#[async_trait]
impl Oracle for MockOracle {
    async fn predict(&self, input: &FeatureVector) -> Result<Scores> {
        if self.state.fail_predict.load(Ordering::SeqCst) {
            return Err(RLError::oracle("predict rejected"));
        }
        self.state.predict_calls.fetch_add(1, Ordering::SeqCst);

        let script = {
            let mut scripts = self.state.scripts.lock().unwrap();
            scripts
                .iter()
                .position(|s| (s.obstacle_x / 600.0 - input.0[0]).abs() < 1e-9)
                .map(|i| scripts.remove(i))
        };

        match script {
            Some(Script { scores, gate, .. }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(scores)
            }
            None => Ok(self.state.default_scores),
        }
    }

    async fn train(&self, inputs: &[FeatureVector], labels: &[ActionLabel]) -> Result<TrainReport> {
        if self.state.fail_train.load(Ordering::SeqCst) {
            return Err(RLError::oracle("train rejected"));
        }
        self.state
            .train_calls
            .lock()
            .unwrap()
            .push((inputs.len(), labels.len()));
        Ok(TrainReport {
            examples: inputs.len(),
            epochs: 1,
            loss: Some(0.0),
        })
    }
}

pub struct MockFactory(pub Arc<MockState>);

impl OracleFactory for MockFactory {
    fn initialize(&self, _: &Architecture, _: &CompileOptions) -> Result<Box<dyn Oracle>> {
        Ok(Box::new(MockOracle {
            state: Arc::clone(&self.0),
        }))
    }
}

pub fn config(resample_probability: f64, stale_policy: StalePolicy) -> LearnerConfig {
    LearnerConfig {
        resample_probability,
        stale_policy,
        seed: Some(17),
        ..LearnerConfig::default()
    }
}

/// Controller with one registered agent, already reset once
pub async fn started(config: LearnerConfig, state: &Arc<MockState>) -> (LifecycleController, AgentId) {
    let mut controller =
        LifecycleController::new(config, Box::new(MockFactory(Arc::clone(state)))).unwrap();
    let id = controller.register_agent();
    controller.on_reset(&[id]).await.unwrap();
    (controller, id)
}

pub fn obstacle(x: f64) -> Obstacle {
    Obstacle { x, y: 75.0, width: 30.0 }
}

pub fn ctx(flight: FlightState, x: f64) -> FrameContext {
    FrameContext {
        flight,
        obstacle: Some(obstacle(x)),
        speed: 50.0,
    }
}

pub fn state(x: f64) -> EnvironmentState {
    EnvironmentState::from_obstacle(&obstacle(x), 50.0)
}

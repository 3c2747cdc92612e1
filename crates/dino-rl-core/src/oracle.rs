//! Contract with the trainable predictor that scores actions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ActionLabel, FeatureVector, Scores, ACTION_DIM, FEATURE_DIM};

/// Activation applied after a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Logistic sigmoid, output in (0, 1)
    Sigmoid,
    /// Hyperbolic tangent, output in (-1, 1)
    Tanh,
    /// Rectified linear unit
    Relu,
    /// Identity
    Linear,
}

impl Activation {
    /// Apply to a single pre-activation value
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
            Self::Linear => x,
        }
    }

    /// Derivative expressed in terms of the activation's output `y`
    #[must_use]
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Self::Sigmoid => y * (1.0 - y),
            Self::Tanh => 1.0 - y * y,
            Self::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear => 1.0,
        }
    }
}

/// One dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Output units
    pub units: usize,
    /// Activation after the affine map
    pub activation: Activation,
}

/// Network shape handed to [`OracleFactory::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    /// Input width
    pub input_size: usize,
    /// Hidden layer
    pub hidden: LayerSpec,
    /// Output layer
    pub output: LayerSpec,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input_size: FEATURE_DIM,
            hidden: LayerSpec {
                units: 6,
                activation: Activation::Sigmoid,
            },
            output: LayerSpec {
                units: ACTION_DIM,
                activation: Activation::Sigmoid,
            },
        }
    }
}

/// Training objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Mean of squared errors over all output slots
    #[default]
    MeanSquaredError,
}

/// Parameter update rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimizer {
    /// Adam with adaptive per-parameter step sizes
    #[default]
    Adam,
    /// Plain stochastic gradient descent
    Sgd,
}

/// How the oracle is compiled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Objective
    pub loss: Loss,
    /// Update rule
    pub optimizer: Optimizer,
    /// Step size
    pub learning_rate: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            loss: Loss::MeanSquaredError,
            optimizer: Optimizer::Adam,
            learning_rate: 0.1,
        }
    }
}

/// Shape of a single `train` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Passes over the whole set
    pub epochs: usize,
    /// Examples per gradient step
    pub batch_size: usize,
    /// Shuffle example order every epoch
    pub shuffle: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 32,
            shuffle: true,
        }
    }
}

/// Summary returned once training completes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainReport {
    /// Examples trained on
    pub examples: usize,
    /// Epochs run
    pub epochs: usize,
    /// Mean loss over the final epoch; `None` when nothing was trained
    pub loss: Option<f64>,
}

/// A trainable predictor mapping feature vectors to three action scores.
///
/// Both calls take `&self` so a prediction can stay in flight while the
/// controller moves on. Implementations serialize `train` against
/// `predict` themselves; `train` is the single writer.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Score the three actions for one input
    async fn predict(&self, input: &FeatureVector) -> crate::Result<Scores>;

    /// Fit on paired inputs and labels; both slices have equal length
    async fn train(
        &self,
        inputs: &[FeatureVector],
        labels: &[ActionLabel],
    ) -> crate::Result<TrainReport>;
}

/// Builds a compiled oracle on an agent's first reset
pub trait OracleFactory: Send + Sync {
    /// Construct and compile a fresh oracle
    fn initialize(
        &self,
        architecture: &Architecture,
        compile: &CompileOptions,
    ) -> crate::Result<Box<dyn Oracle>>;
}

//! Default oracle: a small dense network trained in-process
//!
//! Pure ndarray, no external runtime. The shape is whatever
//! [`Architecture`] says (4 → 6 → 3 sigmoid by default); weights start from
//! Glorot-uniform draws and biases from zero. Training minimizes mean squared
//! error with Adam or plain SGD in shuffled mini-batches.

use async_trait::async_trait;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Dimension, Ix2, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;

use dino_rl_core::{
    ActionLabel, Activation, Architecture, CompileOptions, FeatureVector, Optimizer, Oracle,
    OracleFactory, RLError, Result, Scores, TrainOptions, TrainReport, ACTION_DIM, FEATURE_DIM,
};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// A parameter tensor with its Adam moment estimates
#[derive(Debug, Clone)]
struct Param<D: Dimension> {
    value: ndarray::Array<f64, D>,
    m: ndarray::Array<f64, D>,
    v: ndarray::Array<f64, D>,
}

impl<D: Dimension> Param<D> {
    fn new(value: ndarray::Array<f64, D>) -> Self {
        let m = ndarray::Array::zeros(value.raw_dim());
        let v = ndarray::Array::zeros(value.raw_dim());
        Self { value, m, v }
    }

    fn step<S: Data<Elem = f64>>(&mut self, grad: &ArrayBase<S, D>, optimizer: Optimizer, lr: f64, t: u64) {
        match optimizer {
            Optimizer::Sgd => {
                self.value.zip_mut_with(grad, |p, &g| *p -= lr * g);
            }
            Optimizer::Adam => {
                // Both corrections are exactly 1.0 long before t leaves i32
                let t = i32::try_from(t).unwrap_or(i32::MAX);
                let lr_t = lr * (1.0 - BETA2.powi(t)).sqrt() / (1.0 - BETA1.powi(t));
                Zip::from(&mut self.value)
                    .and(&mut self.m)
                    .and(&mut self.v)
                    .and(grad)
                    .for_each(|p, m, v, &g| {
                        *m = BETA1 * *m + (1.0 - BETA1) * g;
                        *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                        *p -= lr_t * *m / (v.sqrt() + EPSILON);
                    });
            }
        }
    }
}

/// Dense layer `y = act(x · W + b)`
#[derive(Debug, Clone)]
struct Dense {
    weights: Param<Ix2>,
    bias: Param<ndarray::Ix1>,
    activation: Activation,
}

impl Dense {
    fn new(in_dim: usize, out_dim: usize, activation: Activation, rng: &mut StdRng) -> Self {
        Self {
            weights: Param::new(glorot_uniform(in_dim, out_dim, rng)),
            bias: Param::new(Array1::zeros(out_dim)),
            activation,
        }
    }

    fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let activation = self.activation;
        (input.dot(&self.weights.value) + &self.bias.value).mapv_into(|x| activation.apply(x))
    }
}

/// Glorot (Xavier) uniform initialization
fn glorot_uniform(in_dim: usize, out_dim: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
    Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-limit..limit))
}

/// Parameters and optimizer state behind the oracle's lock
#[derive(Debug)]
struct Network {
    hidden: Dense,
    output: Dense,
    compile: CompileOptions,
    train_options: TrainOptions,
    step: u64,
    rng: StdRng,
}

impl Network {
    /// Forward pass over a batch of rows
    fn forward(&self, inputs: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let hidden = self.hidden.forward(inputs);
        let output = self.output.forward(&hidden);
        (hidden, output)
    }

    /// One optimizer step on a mini-batch; returns the batch MSE
    fn train_batch(&mut self, inputs: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let (hidden, output) = self.forward(inputs);
        let error = &output - targets;
        let loss = error.mapv(|e| e * e).mean().unwrap_or(0.0);

        // d(mean((o - y)^2))/do
        let scale = 2.0 / error.len() as f64;
        let out_act = self.output.activation;
        let mut delta_out = error * scale;
        Zip::from(&mut delta_out)
            .and(&output)
            .for_each(|d, &o| *d *= out_act.derivative_from_output(o));

        let grad_w2 = hidden.t().dot(&delta_out);
        let grad_b2 = delta_out.sum_axis(Axis(0));

        let hid_act = self.hidden.activation;
        let mut delta_hidden = delta_out.dot(&self.output.weights.value.t());
        Zip::from(&mut delta_hidden)
            .and(&hidden)
            .for_each(|d, &h| *d *= hid_act.derivative_from_output(h));

        let grad_w1 = inputs.t().dot(&delta_hidden);
        let grad_b1 = delta_hidden.sum_axis(Axis(0));

        self.step += 1;
        let (optimizer, lr, t) = (self.compile.optimizer, self.compile.learning_rate, self.step);
        self.output.weights.step(&grad_w2, optimizer, lr, t);
        self.output.bias.step(&grad_b2, optimizer, lr, t);
        self.hidden.weights.step(&grad_w1, optimizer, lr, t);
        self.hidden.bias.step(&grad_b1, optimizer, lr, t);

        loss
    }

    /// Shuffled mini-batch epochs; returns the mean loss of the last epoch
    fn fit(&mut self, xs: &[[f64; FEATURE_DIM]], ys: &[[f64; ACTION_DIM]]) -> f64 {
        let options = self.train_options;
        let mut order: Vec<usize> = (0..xs.len()).collect();
        let mut epoch_loss = 0.0;

        for _ in 0..options.epochs {
            if options.shuffle {
                order.shuffle(&mut self.rng);
            }
            let mut weighted = 0.0;
            for chunk in order.chunks(options.batch_size.max(1)) {
                let batch_loss = self.train_batch(&rows(xs, chunk), &rows(ys, chunk));
                weighted += batch_loss * chunk.len() as f64;
            }
            epoch_loss = weighted / xs.len() as f64;
        }
        epoch_loss
    }
}

fn rows<const N: usize>(values: &[[f64; N]], indices: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((indices.len(), N), |(i, j)| values[indices[i]][j])
}

/// Two-layer perceptron implementing [`Oracle`].
///
/// Parameters sit behind a `tokio` read-write lock: predictions share it,
/// training holds it exclusively, so a fit never overlaps inference.
#[derive(Debug)]
pub struct MlpOracle {
    network: RwLock<Network>,
}

impl MlpOracle {
    /// Build and compile a network
    pub fn new(
        architecture: &Architecture,
        compile: &CompileOptions,
        train_options: TrainOptions,
        seed: Option<u64>,
    ) -> Result<Self> {
        if architecture.input_size != FEATURE_DIM {
            return Err(RLError::DimensionMismatch {
                expected: FEATURE_DIM,
                actual: architecture.input_size,
            });
        }
        if architecture.output.units != ACTION_DIM {
            return Err(RLError::DimensionMismatch {
                expected: ACTION_DIM,
                actual: architecture.output.units,
            });
        }
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hidden = Dense::new(
            architecture.input_size,
            architecture.hidden.units,
            architecture.hidden.activation,
            &mut rng,
        );
        let output = Dense::new(
            architecture.hidden.units,
            architecture.output.units,
            architecture.output.activation,
            &mut rng,
        );

        Ok(Self {
            network: RwLock::new(Network {
                hidden,
                output,
                compile: *compile,
                train_options,
                step: 0,
                rng,
            }),
        })
    }

    /// Optimizer steps taken so far
    pub async fn steps(&self) -> u64 {
        self.network.read().await.step
    }
}

#[async_trait]
impl Oracle for MlpOracle {
    async fn predict(&self, input: &FeatureVector) -> Result<Scores> {
        let batch = Array2::from_shape_fn((1, FEATURE_DIM), |(_, j)| input.0[j]);
        let (_, output) = self.network.read().await.forward(&batch);
        let row = output.row(0);
        if row.iter().any(|v| !v.is_finite()) {
            return Err(RLError::oracle("network produced a non-finite score"));
        }
        ActionLabel::from_slice(&row.to_vec())
    }

    async fn train(&self, inputs: &[FeatureVector], labels: &[ActionLabel]) -> Result<TrainReport> {
        if inputs.len() != labels.len() {
            return Err(RLError::DimensionMismatch {
                expected: inputs.len(),
                actual: labels.len(),
            });
        }
        if inputs.is_empty() {
            return Ok(TrainReport::default());
        }

        let xs: Vec<[f64; FEATURE_DIM]> = inputs.iter().map(|v| v.0).collect();
        let ys: Vec<[f64; ACTION_DIM]> = labels.iter().map(|l| l.0).collect();
        let mut network = self.network.write().await;
        let loss = network.fit(&xs, &ys);

        if !loss.is_finite() {
            return Err(RLError::oracle("training diverged"));
        }
        Ok(TrainReport {
            examples: xs.len(),
            epochs: network.train_options.epochs,
            loss: Some(loss),
        })
    }
}

/// Builds [`MlpOracle`]s for the lifecycle controller
#[derive(Debug, Clone, Copy, Default)]
pub struct MlpOracleFactory {
    train_options: TrainOptions,
    seed: Option<u64>,
}

impl MlpOracleFactory {
    /// Create a factory
    #[must_use]
    pub fn new(train_options: TrainOptions, seed: Option<u64>) -> Self {
        Self { train_options, seed }
    }
}

impl OracleFactory for MlpOracleFactory {
    fn initialize(&self, architecture: &Architecture, compile: &CompileOptions) -> Result<Box<dyn Oracle>> {
        let oracle = MlpOracle::new(architecture, compile, self.train_options, self.seed)?;
        Ok(Box::new(oracle))
    }
}

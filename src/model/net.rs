//! The learnable-function contract and reference models.
//!
//! The aggregation loop never names a concrete architecture; anything
//! implementing [`Model`] can participate. The two models here are
//! deliberately small reference implementations.

use rand::Rng;

use crate::config::ModelKind;
use crate::core::{Error, Result};
use crate::model::tensor::{ParameterSnapshot, Tensor};

/// Hidden width of the reference MLP.
pub const DEFAULT_HIDDEN_DIM: usize = 64;

/// Training/evaluation mode toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Contract a model must satisfy to participate in federated averaging.
///
/// `forward` yields log-probabilities per class; gradients accumulate
/// across `backward` calls until `zero_grad`, and `step` applies SGD with
/// momentum. Full learnable state moves through [`ParameterSnapshot`]s.
pub trait Model {
    /// Log-probabilities for one sample.
    fn forward(&self, features: &[f32]) -> Vec<f32>;

    /// Accumulate gradients of the negative-log-likelihood loss for one
    /// sample, returning that sample's loss.
    fn backward(&mut self, features: &[f32], label: usize) -> f32;

    /// Reset accumulated gradients to zero.
    fn zero_grad(&mut self);

    /// Multiply accumulated gradients by `factor`.
    fn scale_gradients(&mut self, factor: f32);

    /// One SGD step with momentum over the accumulated gradients.
    fn step(&mut self, lr: f32, momentum: f32);

    /// Export the full learnable state.
    fn state_dict(&self) -> ParameterSnapshot;

    /// Import a full learnable state, rejecting structural mismatches.
    fn load_state_dict(&mut self, snapshot: &ParameterSnapshot) -> Result<()>;

    /// Switch between training and evaluation mode.
    fn set_mode(&mut self, mode: Mode);

    /// Current mode.
    fn mode(&self) -> Mode;
}

/// Build a model by kind.
pub fn build_model<R: Rng>(
    kind: ModelKind,
    dim_in: usize,
    num_classes: usize,
    rng: &mut R,
) -> Box<dyn Model> {
    match kind {
        ModelKind::Mlp => Box::new(Mlp::new(dim_in, DEFAULT_HIDDEN_DIM, num_classes, rng)),
        ModelKind::Linear => Box::new(Linear::new(dim_in, num_classes, rng)),
    }
}

fn init_buffer<R: Rng>(len: usize, fan_in: usize, rng: &mut R) -> Vec<f32> {
    let scale = (2.0 / fan_in.max(1) as f32).sqrt();
    (0..len)
        .map(|_| rng.gen::<f32>() * scale - scale / 2.0)
        .collect()
}

fn log_softmax(mut logits: Vec<f32>) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let sum_exp: f32 = logits.iter().map(|&z| (z - max).exp()).sum();
    let lse = max + sum_exp.ln();
    for z in &mut logits {
        *z -= lse;
    }
    logits
}

fn sgd_step(params: &mut [f32], grads: &[f32], velocity: &mut [f32], lr: f32, momentum: f32) {
    for ((p, &g), v) in params.iter_mut().zip(grads.iter()).zip(velocity.iter_mut()) {
        *v = momentum * *v + g;
        *p -= lr * *v;
    }
}

fn copy_tensor(snapshot: &ParameterSnapshot, name: &str) -> Result<Vec<f32>> {
    snapshot
        .get(name)
        .map(|t| t.data().to_vec())
        .ok_or_else(|| Error::MissingParameter(name.to_string()))
}

/// Single-layer softmax regression.
#[derive(Clone, Debug)]
pub struct Linear {
    dim_in: usize,
    dim_out: usize,
    weight: Vec<f32>,
    bias: Vec<f32>,
    grad_weight: Vec<f32>,
    grad_bias: Vec<f32>,
    vel_weight: Vec<f32>,
    vel_bias: Vec<f32>,
    mode: Mode,
}

impl Linear {
    /// Create with random initialization.
    pub fn new<R: Rng>(dim_in: usize, dim_out: usize, rng: &mut R) -> Self {
        Self {
            dim_in,
            dim_out,
            weight: init_buffer(dim_out * dim_in, dim_in, rng),
            bias: vec![0.0; dim_out],
            grad_weight: vec![0.0; dim_out * dim_in],
            grad_bias: vec![0.0; dim_out],
            vel_weight: vec![0.0; dim_out * dim_in],
            vel_bias: vec![0.0; dim_out],
            mode: Mode::Train,
        }
    }

    fn logits(&self, features: &[f32]) -> Vec<f32> {
        (0..self.dim_out)
            .map(|o| {
                let row = &self.weight[o * self.dim_in..(o + 1) * self.dim_in];
                row.iter()
                    .zip(features.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + self.bias[o]
            })
            .collect()
    }
}

impl Model for Linear {
    fn forward(&self, features: &[f32]) -> Vec<f32> {
        log_softmax(self.logits(features))
    }

    fn backward(&mut self, features: &[f32], label: usize) -> f32 {
        let log_probs = log_softmax(self.logits(features));
        let loss = -log_probs[label];

        for o in 0..self.dim_out {
            let mut dz = log_probs[o].exp();
            if o == label {
                dz -= 1.0;
            }
            for (i, &x) in features.iter().enumerate() {
                self.grad_weight[o * self.dim_in + i] += dz * x;
            }
            self.grad_bias[o] += dz;
        }
        loss
    }

    fn zero_grad(&mut self) {
        self.grad_weight.fill(0.0);
        self.grad_bias.fill(0.0);
    }

    fn scale_gradients(&mut self, factor: f32) {
        for g in &mut self.grad_weight {
            *g *= factor;
        }
        for g in &mut self.grad_bias {
            *g *= factor;
        }
    }

    fn step(&mut self, lr: f32, momentum: f32) {
        sgd_step(
            &mut self.weight,
            &self.grad_weight,
            &mut self.vel_weight,
            lr,
            momentum,
        );
        sgd_step(
            &mut self.bias,
            &self.grad_bias,
            &mut self.vel_bias,
            lr,
            momentum,
        );
    }

    fn state_dict(&self) -> ParameterSnapshot {
        let mut snapshot = ParameterSnapshot::new();
        snapshot.insert(
            "weight",
            Tensor::from_vec(vec![self.dim_out, self.dim_in], self.weight.clone())
                .expect("weight buffer matches its shape"),
        );
        snapshot.insert(
            "bias",
            Tensor::from_vec(vec![self.dim_out], self.bias.clone())
                .expect("bias buffer matches its shape"),
        );
        snapshot
    }

    fn load_state_dict(&mut self, snapshot: &ParameterSnapshot) -> Result<()> {
        self.state_dict().ensure_same_structure(snapshot)?;
        self.weight = copy_tensor(snapshot, "weight")?;
        self.bias = copy_tensor(snapshot, "bias")?;
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}

/// Two-layer perceptron: ReLU hidden layer, log-softmax output.
#[derive(Clone, Debug)]
pub struct Mlp {
    dim_in: usize,
    dim_hidden: usize,
    dim_out: usize,
    w1: Vec<f32>,
    b1: Vec<f32>,
    w2: Vec<f32>,
    b2: Vec<f32>,
    grad_w1: Vec<f32>,
    grad_b1: Vec<f32>,
    grad_w2: Vec<f32>,
    grad_b2: Vec<f32>,
    vel_w1: Vec<f32>,
    vel_b1: Vec<f32>,
    vel_w2: Vec<f32>,
    vel_b2: Vec<f32>,
    mode: Mode,
}

impl Mlp {
    /// Create with random initialization.
    pub fn new<R: Rng>(dim_in: usize, dim_hidden: usize, dim_out: usize, rng: &mut R) -> Self {
        Self {
            dim_in,
            dim_hidden,
            dim_out,
            w1: init_buffer(dim_hidden * dim_in, dim_in, rng),
            b1: vec![0.0; dim_hidden],
            w2: init_buffer(dim_out * dim_hidden, dim_hidden, rng),
            b2: vec![0.0; dim_out],
            grad_w1: vec![0.0; dim_hidden * dim_in],
            grad_b1: vec![0.0; dim_hidden],
            grad_w2: vec![0.0; dim_out * dim_hidden],
            grad_b2: vec![0.0; dim_out],
            vel_w1: vec![0.0; dim_hidden * dim_in],
            vel_b1: vec![0.0; dim_hidden],
            vel_w2: vec![0.0; dim_out * dim_hidden],
            vel_b2: vec![0.0; dim_out],
            mode: Mode::Train,
        }
    }

    fn hidden_pre_activation(&self, features: &[f32]) -> Vec<f32> {
        (0..self.dim_hidden)
            .map(|h| {
                let row = &self.w1[h * self.dim_in..(h + 1) * self.dim_in];
                row.iter()
                    .zip(features.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + self.b1[h]
            })
            .collect()
    }

    fn output_logits(&self, hidden: &[f32]) -> Vec<f32> {
        (0..self.dim_out)
            .map(|o| {
                let row = &self.w2[o * self.dim_hidden..(o + 1) * self.dim_hidden];
                row.iter()
                    .zip(hidden.iter())
                    .map(|(w, a)| w * a)
                    .sum::<f32>()
                    + self.b2[o]
            })
            .collect()
    }
}

impl Model for Mlp {
    fn forward(&self, features: &[f32]) -> Vec<f32> {
        let z1 = self.hidden_pre_activation(features);
        let a1: Vec<f32> = z1.iter().map(|&z| z.max(0.0)).collect();
        log_softmax(self.output_logits(&a1))
    }

    fn backward(&mut self, features: &[f32], label: usize) -> f32 {
        let z1 = self.hidden_pre_activation(features);
        let a1: Vec<f32> = z1.iter().map(|&z| z.max(0.0)).collect();
        let log_probs = log_softmax(self.output_logits(&a1));
        let loss = -log_probs[label];

        // Output layer: dz2 = softmax - onehot
        let mut dz2 = vec![0.0; self.dim_out];
        for o in 0..self.dim_out {
            dz2[o] = log_probs[o].exp();
            if o == label {
                dz2[o] -= 1.0;
            }
            for (h, &a) in a1.iter().enumerate() {
                self.grad_w2[o * self.dim_hidden + h] += dz2[o] * a;
            }
            self.grad_b2[o] += dz2[o];
        }

        // Hidden layer through the ReLU gate
        for h in 0..self.dim_hidden {
            if z1[h] <= 0.0 {
                continue;
            }
            let da: f32 = (0..self.dim_out)
                .map(|o| self.w2[o * self.dim_hidden + h] * dz2[o])
                .sum();
            for (i, &x) in features.iter().enumerate() {
                self.grad_w1[h * self.dim_in + i] += da * x;
            }
            self.grad_b1[h] += da;
        }
        loss
    }

    fn zero_grad(&mut self) {
        self.grad_w1.fill(0.0);
        self.grad_b1.fill(0.0);
        self.grad_w2.fill(0.0);
        self.grad_b2.fill(0.0);
    }

    fn scale_gradients(&mut self, factor: f32) {
        for buffer in [
            &mut self.grad_w1,
            &mut self.grad_b1,
            &mut self.grad_w2,
            &mut self.grad_b2,
        ] {
            for g in buffer.iter_mut() {
                *g *= factor;
            }
        }
    }

    fn step(&mut self, lr: f32, momentum: f32) {
        sgd_step(&mut self.w1, &self.grad_w1, &mut self.vel_w1, lr, momentum);
        sgd_step(&mut self.b1, &self.grad_b1, &mut self.vel_b1, lr, momentum);
        sgd_step(&mut self.w2, &self.grad_w2, &mut self.vel_w2, lr, momentum);
        sgd_step(&mut self.b2, &self.grad_b2, &mut self.vel_b2, lr, momentum);
    }

    fn state_dict(&self) -> ParameterSnapshot {
        let mut snapshot = ParameterSnapshot::new();
        snapshot.insert(
            "hidden.weight",
            Tensor::from_vec(vec![self.dim_hidden, self.dim_in], self.w1.clone())
                .expect("w1 buffer matches its shape"),
        );
        snapshot.insert(
            "hidden.bias",
            Tensor::from_vec(vec![self.dim_hidden], self.b1.clone())
                .expect("b1 buffer matches its shape"),
        );
        snapshot.insert(
            "output.weight",
            Tensor::from_vec(vec![self.dim_out, self.dim_hidden], self.w2.clone())
                .expect("w2 buffer matches its shape"),
        );
        snapshot.insert(
            "output.bias",
            Tensor::from_vec(vec![self.dim_out], self.b2.clone())
                .expect("b2 buffer matches its shape"),
        );
        snapshot
    }

    fn load_state_dict(&mut self, snapshot: &ParameterSnapshot) -> Result<()> {
        self.state_dict().ensure_same_structure(snapshot)?;
        self.w1 = copy_tensor(snapshot, "hidden.weight")?;
        self.b1 = copy_tensor(snapshot, "hidden.bias")?;
        self.w2 = copy_tensor(snapshot, "output.weight")?;
        self.b2 = copy_tensor(snapshot, "output.bias")?;
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}

use super::Optimizer;
use crate::{MlErr, Result};

/// Stochastic gradient descent with L2 weight decay, momentum and optionally Nesterov momentum.
///
/// Each update computes, for every parameter `p` with gradient `g` and velocity `v`:
/// `g += wd * p; v = mu * v + g; g = g + mu * v` (nesterov) or `g = v`, `p -= lr * g`.
#[derive(Debug)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    nesterov: bool,
    velocity: Box<[f32]>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The decay of the velocity buffer, `0` disables momentum.
    /// * `weight_decay` - The L2 penalty added to the gradient.
    /// * `nesterov` - Whether to use Nesterov momentum.
    ///
    /// # Returns
    /// A new `Sgd` instance.
    pub fn new(
        len: usize,
        learning_rate: f32,
        momentum: f32,
        weight_decay: f32,
        nesterov: bool,
    ) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            nesterov,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || params.len() != self.velocity.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer parameters",
                got: grad.len(),
                expected: self.velocity.len(),
            });
        }

        let Self {
            learning_rate: lr,
            momentum: mu,
            weight_decay: wd,
            nesterov,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, &g), v)| {
                let g = g + wd * *p;
                *v = mu * *v + g;

                let step = if nesterov { g + mu * *v } else { *v };
                *p -= lr * step;
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

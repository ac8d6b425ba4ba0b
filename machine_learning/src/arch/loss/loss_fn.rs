use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A classification loss over per-class scores and integer labels.
pub trait LossFn {
    /// The mean loss over the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: &[usize]) -> Result<f32>;

    /// The derivative of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: &[usize]) -> Result<Array2<f32>>;
}

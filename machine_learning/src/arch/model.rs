use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A parametric function mapping a batch of feature rows to per-class scores.
///
/// A `Model` does not own its parameters, they live in a flat buffer handed to every pass, which
/// lets the caller snapshot, persist and restore them freely.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - A batch of inputs, one row per sample.
    ///
    /// # Returns
    /// The per-class scores for each row or an error if the shapes don't match.
    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Backpropagates `d`, the derivative of the loss with respect to the output of the last
    /// `forward` call, writing the gradient of every parameter into `grad`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, the same used on the last `forward`.
    /// * `grad` - A buffer of `size()` elements, overwritten.
    /// * `d` - The derivative of the loss with respect to the output.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}

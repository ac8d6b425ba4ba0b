use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::LossFn;
use crate::{MlErr, Result};

/// Softmax cross-entropy over raw scores (logits), averaged over the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    /// Computes `log(sum(exp(row)))` shifting by the row's maximum first.
    fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
        let max = row.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
        max + row.mapv(|x| (x - max).exp()).sum().ln()
    }

    fn check(y_pred: &ArrayView2<f32>, y: &[usize]) -> Result<()> {
        if y_pred.nrows() != y.len() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: y.len(),
                expected: y_pred.nrows(),
            });
        }

        let classes = y_pred.ncols();
        if let Some(&label) = y.iter().find(|&&label| label >= classes) {
            return Err(MlErr::LabelOutOfRange { label, classes });
        }

        Ok(())
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: &[usize]) -> Result<f32> {
        Self::check(&y_pred, y)?;

        if y.is_empty() {
            return Ok(0.);
        }

        let total: f32 = y_pred
            .axis_iter(Axis(0))
            .zip(y)
            .map(|(row, &label)| Self::log_sum_exp(row) - row[label])
            .sum();

        Ok(total / y.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: &[usize]) -> Result<Array2<f32>> {
        Self::check(&y_pred, y)?;

        let n = y.len().max(1) as f32;
        let mut d = y_pred.to_owned();

        for (mut row, &label) in d.axis_iter_mut(Axis(0)).zip(y) {
            let lse = Self::log_sum_exp(row.view());
            row.mapv_inplace(|x| (x - lse).exp() / n);
            row[label] -= 1. / n;
        }

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn uniform_scores_give_log_classes() {
        let y_pred = array![[0., 0.], [3., 3.]];
        let loss = CrossEntropy.loss(y_pred.view(), &[0, 1]).unwrap();

        assert!((loss - 2f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn large_scores_do_not_overflow() {
        let y_pred = array![[1000., 0.]];
        let loss = CrossEntropy.loss(y_pred.view(), &[0]).unwrap();

        assert!(loss.is_finite());
        assert!(loss < 1e-6);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let y_pred = array![[1., 2., 3.], [0.5, -1., 0.]];
        let d = CrossEntropy.loss_prime(y_pred.view(), &[2, 0]).unwrap();

        for row in d.axis_iter(Axis(0)) {
            assert!(row.sum().abs() < 1e-6);
        }

        assert!(d[[0, 2]] < 0.);
        assert!(d[[1, 0]] < 0.);
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let y_pred = array![[0., 0.]];

        assert!(matches!(
            CrossEntropy.loss(y_pred.view(), &[2]),
            Err(MlErr::LabelOutOfRange { label: 2, classes: 2 })
        ));
    }
}

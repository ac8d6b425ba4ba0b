use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

/// An in-memory labeled dataset: one row of features per sample and its class index.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `features` - A `(samples, features)` matrix.
    /// * `labels` - The class index of every sample.
    ///
    /// # Returns
    /// An error if there are no samples or the amount of labels doesn't match the amount of rows.
    pub fn new(features: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if labels.len() != features.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: labels.len(),
                expected: features.nrows(),
            });
        }

        if labels.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self { features, labels })
    }

    /// Creates a new `Dataset` from row-major feature rows.
    pub fn from_rows(rows: Vec<Vec<f32>>, labels: Vec<usize>) -> Result<Self> {
        let n_features = rows.first().map_or(0, Vec::len);

        if let Some(row) = rows.iter().find(|row| row.len() != n_features) {
            return Err(MlErr::SizeMismatch {
                what: "dataset row",
                got: row.len(),
                expected: n_features,
            });
        }

        let n_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        let features =
            Array2::from_shape_vec((n_rows, n_features), data).map_err(|_| MlErr::SizeMismatch {
                what: "dataset features",
                got: n_rows,
                expected: n_rows * n_features,
            })?;

        Self::new(features, labels)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// The amount of distinct classes among the labels.
    pub fn n_classes(&self) -> usize {
        let mut labels = self.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Returns a copy of the row of features at `index`.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    #[inline]
    pub fn row(&self, index: usize) -> Vec<f32> {
        self.features.row(index).to_vec()
    }

    /// Creates a new dataset with the samples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let features = self.features.select(ndarray::Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        Self::new(features, labels)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dataset() -> Dataset {
        Dataset::new(array![[0., 1.], [2., 3.], [4., 5.]], vec![1, 0, 1]).unwrap()
    }

    #[test]
    fn dataset_basic() {
        let ds = dataset();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.n_classes(), 2);
        assert_eq!(ds.row(1), vec![2., 3.]);
    }

    #[test]
    fn subset_keeps_order() {
        let sub = dataset().subset(&[2, 0]).unwrap();
        assert_eq!(sub.features(), array![[4., 5.], [0., 1.]]);
        assert_eq!(sub.labels(), &[1, 1]);
    }

    #[test]
    fn rejects_mismatched_labels() {
        assert!(Dataset::new(array![[0.], [1.]], vec![0]).is_err());
        assert!(matches!(
            Dataset::from_rows(vec![], vec![]),
            Err(MlErr::EmptyDataset)
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let rows = vec![vec![0., 1.], vec![2.]];
        assert!(Dataset::from_rows(rows, vec![0, 1]).is_err());
    }
}

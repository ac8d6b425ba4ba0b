use super::{Batch, DataLoader};
use crate::{MlErr, Result};

/// An endless stream of batches over a finite `DataLoader`.
///
/// Whenever a pass of the loader is exhausted it is restarted (and reshuffled, if the loader is
/// shuffled) transparently, so the consumer always gets a next batch.
pub struct ForeverDataIterator {
    loader: DataLoader,
    passes: usize,
}

impl ForeverDataIterator {
    /// Creates a new `ForeverDataIterator`.
    ///
    /// # Returns
    /// An error if a pass of `loader` would never yield a batch.
    pub fn new(loader: DataLoader) -> Result<Self> {
        if loader.is_empty() {
            return Err(MlErr::EmptyLoader {
                samples: loader.dataset().len(),
                batch_size: loader.batch_size(),
            });
        }

        Ok(Self { loader, passes: 0 })
    }

    /// The amount of times the underlying loader was restarted.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn next_batch(&mut self) -> Batch {
        loop {
            if let Some(batch) = self.loader.next_batch() {
                return batch;
            }

            self.loader.reset();
            self.passes += 1;
        }
    }
}

impl Iterator for ForeverDataIterator {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::dataset::Dataset;

    fn loader(n: usize, batch_size: usize) -> DataLoader {
        let features = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
        let dataset = Dataset::new(features, (0..n).collect()).unwrap();

        DataLoader::new(dataset, NonZeroUsize::new(batch_size).unwrap())
            .shuffled(StdRng::seed_from_u64(5))
            .drop_last(true)
    }

    #[test]
    fn restarts_past_the_end_of_the_dataset() {
        let mut stream = ForeverDataIterator::new(loader(5, 2)).unwrap();

        let batches: Vec<_> = stream.by_ref().take(7).collect();

        assert_eq!(batches.len(), 7);
        assert!(batches.iter().all(|b| b.len() == 2));
        assert_eq!(stream.passes(), 3);
    }

    #[test]
    fn every_pass_covers_full_batches_once() {
        let mut stream = ForeverDataIterator::new(loader(6, 3)).unwrap();

        for _ in 0..4 {
            let mut seen: Vec<_> = stream.by_ref().take(2).flat_map(|b| b.y).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn rejects_loader_that_never_yields() {
        assert!(matches!(
            ForeverDataIterator::new(loader(3, 4)),
            Err(MlErr::EmptyLoader { samples: 3, batch_size: 4 })
        ));
    }
}

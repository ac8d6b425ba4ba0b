use std::{num::NonZeroUsize, sync::Arc};

use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{MlErr, Result, dataset::Dataset};

/// An owned batch of samples.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Splits a dataset in fixed-size batches, one pass at a time.
///
/// A pass visits every sample once, in dataset order or in a fresh random permutation when the
/// loader is shuffled. The last batch may be short, unless `drop_last` is set.
pub struct DataLoader {
    dataset: Dataset,
    batch_size: NonZeroUsize,
    drop_last: bool,
    rng: Option<StdRng>,
    pool: Option<Arc<ThreadPool>>,
    order: Vec<usize>,
    cursor: usize,
}

impl DataLoader {
    /// Creates a new sequential `DataLoader` that keeps the short last batch.
    pub fn new(dataset: Dataset, batch_size: NonZeroUsize) -> Self {
        let order = (0..dataset.len()).collect();

        Self {
            dataset,
            batch_size,
            drop_last: false,
            rng: None,
            pool: None,
            order,
            cursor: 0,
        }
    }

    /// Shuffles the samples at the start of every pass using `rng`.
    pub fn shuffled(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self.reset();
        self
    }

    /// Whether to skip the last batch of a pass when it's shorter than the batch size.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Gathers the rows of each batch on a pool of `workers` threads. Zero keeps the gathering
    /// on the calling thread. The batches are the same regardless of the amount of workers.
    pub fn workers(mut self, workers: usize) -> Result<Self> {
        if workers == 0 {
            self.pool = None;
            return Ok(self);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("loader-{i}"))
            .build()
            .map_err(|e| MlErr::WorkerPool(e.to_string()))?;

        self.pool = Some(Arc::new(pool));
        Ok(self)
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// The amount of batches yielded per pass.
    pub fn len(&self) -> usize {
        let (n, b) = (self.dataset.len(), self.batch_size.get());

        if self.drop_last { n / b } else { n.div_ceil(b) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a new pass, reshuffling the samples if the loader is shuffled.
    pub fn reset(&mut self) {
        self.cursor = 0;

        if let Some(rng) = &mut self.rng {
            self.order.shuffle(rng);
        }
    }

    /// Returns the next batch of this pass, or `None` if the pass is exhausted.
    pub fn next_batch(&mut self) -> Option<Batch> {
        let remaining = self.order.len() - self.cursor;
        let b = self.batch_size.get();

        if remaining == 0 || (self.drop_last && remaining < b) {
            return None;
        }

        let end = self.cursor + remaining.min(b);
        let batch = self.gather(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }

    fn gather(&self, indices: &[usize]) -> Batch {
        let x = match &self.pool {
            Some(pool) => {
                let rows: Vec<Vec<f32>> =
                    pool.install(|| indices.par_iter().map(|&i| self.dataset.row(i)).collect());
                let shape = (indices.len(), self.dataset.n_features());
                Array2::from_shape_fn(shape, |(r, c)| rows[r][c])
            }
            None => self.dataset.features().select(Axis(0), indices),
        };

        let labels = self.dataset.labels();
        let y = indices.iter().map(|&i| labels[i]).collect();

        Batch { x, y }
    }
}

impl Iterator for DataLoader {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

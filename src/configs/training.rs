use serde::{Deserialize, Serialize};

/// The hyperparameters of a single training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Threads gathering batch rows, `0` gathers them on the calling thread.
    pub workers: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub print_freq: usize,
    pub seed: Option<u64>,
    pub iters_per_epoch: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            epochs: 10,
            batch_size: 32,
            lr: 0.01,
            momentum: 0.9,
            weight_decay: 1e-3,
            print_freq: 100,
            seed: None,
            iters_per_epoch: 313,
        }
    }
}

impl TrainingConfig {
    /// Returns a copy of this config seeded for one sweep cell.
    pub fn with_seed(&self, seed: Option<u64>) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}

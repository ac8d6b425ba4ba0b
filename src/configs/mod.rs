mod model;
mod sweep;
mod training;

pub use model::{ActFnConfig, ModelConfig};
pub use sweep::{
    DataConfig, GeneratedSeeds, MAX_RANDOM_SEED, RunConfig, SeedsConfig, SweepConfig,
};
pub use training::TrainingConfig;

mod evaluator;
mod metrics;
mod model_trainer;

pub use evaluator::{EvalStats, evaluate};
pub use metrics::{AverageMeter, ProgressMeter, accuracy, correct};
pub use model_trainer::{EpochStats, ModelTrainer};

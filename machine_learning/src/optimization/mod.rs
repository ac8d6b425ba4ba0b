mod lr_schedule;
mod optimizer;
mod sgd;

pub use lr_schedule::{LrSchedule, StepwiseLr};
pub use optimizer::Optimizer;
pub use sgd::Sgd;

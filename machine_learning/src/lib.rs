pub mod arch;
pub mod data;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod training;

pub use error::{MlErr, Result};

pub mod checkpoint;
pub mod configs;
pub mod data;
pub mod error;
pub mod results;
pub mod run;
pub mod sweep;

pub use error::{Result, SweepErr};

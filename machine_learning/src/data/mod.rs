pub mod dataloader;
pub mod forever;

pub use dataloader::{Batch, DataLoader};
pub use forever::ForeverDataIterator;

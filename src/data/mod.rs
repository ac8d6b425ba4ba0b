mod labels;
mod records;
mod splitter;

pub use labels::LabelEncoder;
pub use records::{Records, load_records};
pub use splitter::{DatasetSplit, Splitter};

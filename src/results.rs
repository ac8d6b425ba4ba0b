use std::{
    fmt,
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::{Result, SweepErr};

pub const HEADER: [&str; 5] = [
    "target_train_path",
    "seed_index",
    "seed",
    "validate_acc",
    "test_acc",
];

/// The outcome of one sweep cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub dataset_id: String,
    pub seed_index: usize,
    pub seed: Option<u64>,
    pub validation_accuracy: f32,
    pub test_accuracy: f32,
}

impl ResultRow {
    fn record(&self) -> [String; 5] {
        [
            self.dataset_id.clone(),
            self.seed_index.to_string(),
            self.seed.map_or_else(|| "None".to_string(), |s| s.to_string()),
            self.validation_accuracy.to_string(),
            self.test_accuracy.to_string(),
        ]
    }
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record().join(","))
    }
}

/// The append-only csv log every finished cell writes a row to.
pub struct ResultsLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ResultsLog {
    /// Creates the log at `path`, truncating any previous contents, and writes its header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut log = Self { path, writer };
        log.write(&HEADER)?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `row` and flushes it to disk.
    pub fn append(&mut self, row: &ResultRow) -> Result<()> {
        self.write(&row.record())
    }

    fn write<S: AsRef<[u8]>>(&mut self, record: &[S]) -> Result<()> {
        self.writer
            .write_record(record)
            .map_err(|source| SweepErr::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn row(seed: Option<u64>) -> ResultRow {
        ResultRow {
            dataset_id: "size10".into(),
            seed_index: 1,
            seed,
            validation_accuracy: 93.75,
            test_accuracy: 81.2,
        }
    }

    #[test]
    fn rows_are_visible_right_after_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        let mut log = ResultsLog::create(&path).unwrap();

        log.append(&row(Some(43277))).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "target_train_path,seed_index,seed,validate_acc,test_acc\nsize10,1,43277,93.75,81.2\n"
        );
    }

    #[test]
    fn create_truncates_previous_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("log.txt");

        let mut log = ResultsLog::create(&path).unwrap();
        log.append(&row(None)).unwrap();
        drop(log);

        ResultsLog::create(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn missing_seed_renders_as_none() {
        assert_eq!(row(None).to_string(), "size10,1,None,93.75,81.2");
    }
}

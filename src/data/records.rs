use std::path::{Path, PathBuf};

use crate::{Result, SweepErr};

/// The raw contents of a labeled csv file: numeric feature rows and their raw labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    pub path: PathBuf,
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

impl Records {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Reads a headered csv file whose `label_key` column holds the labels and every other column
/// holds a numeric feature.
///
/// # Returns
/// The records in file order or an error if the file is missing, has no records, lacks the label
/// column or holds a ragged or non-numeric record.
pub fn load_records<P: AsRef<Path>>(path: P, label_key: &str) -> Result<Records> {
    let path = path.as_ref().to_path_buf();
    let csv_err = |source| SweepErr::Csv {
        path: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == label_key)
        .ok_or_else(|| SweepErr::MissingLabel {
            path: path.clone(),
            label_key: label_key.to_string(),
        })?;

    let feature_names = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != label_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut features = Vec::new();
    let mut labels = Vec::new();

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());

        let mut row = Vec::with_capacity(record.len().saturating_sub(1));
        for (i, field) in record.iter().enumerate() {
            if i == label_idx {
                labels.push(field.to_string());
                continue;
            }

            let value = field.parse::<f32>().map_err(|_| SweepErr::InvalidRecord {
                path: path.clone(),
                line,
                msg: format!("column {:?} holds non-numeric value {field:?}", &headers[i]),
            })?;
            row.push(value);
        }
        features.push(row);
    }

    if labels.is_empty() {
        return Err(SweepErr::EmptyFile { path });
    }

    Ok(Records {
        path,
        feature_names,
        features,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn label_column_found_by_name() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "x1,diagnosis,x2\n1.5,yes,2\n-3, no ,4e-1\n");

        let records = load_records(&path, "diagnosis").unwrap();

        assert_eq!(records.feature_names, vec!["x1", "x2"]);
        assert_eq!(records.features, vec![vec![1.5, 2.], vec![-3., 0.4]]);
        assert_eq!(records.labels, vec!["yes", "no"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records.n_features(), 2);
    }

    #[test]
    fn missing_label_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "x1,x2\n1,2\n");

        let err = load_records(&path, "diagnosis").unwrap_err();
        assert!(matches!(err, SweepErr::MissingLabel { .. }));
    }

    #[test]
    fn non_numeric_feature_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "x,diagnosis\n1,0\nabc,1\n");

        match load_records(&path, "diagnosis").unwrap_err() {
            SweepErr::InvalidRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn ragged_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "x,y,diagnosis\n1,2,0\n1,0\n");

        let err = load_records(&path, "diagnosis").unwrap_err();
        assert!(matches!(err, SweepErr::Csv { .. }));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "x,diagnosis\n");

        let err = load_records(&path, "diagnosis").unwrap_err();
        assert!(matches!(err, SweepErr::EmptyFile { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_records(dir.path().join("nope.csv"), "diagnosis").unwrap_err();
        assert!(matches!(err, SweepErr::Csv { .. }));
    }
}

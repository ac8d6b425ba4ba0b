use std::path::Path;

use crate::{Result, SweepErr};

/// Maps raw label strings to class indices.
///
/// Classes are the distinct labels of the fitting set, sorted numerically when every label is a
/// number and lexicographically otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();

        let numeric: Option<Vec<f64>> = classes.iter().map(|l| l.parse().ok()).collect();
        if let Some(values) = numeric {
            let mut keyed: Vec<_> = values.into_iter().zip(classes).collect();
            keyed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
            classes = keyed.into_iter().map(|(_, class)| class).collect();
        }

        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Encodes every label of the file at `path`.
    ///
    /// # Returns
    /// The class indices or an error naming the first label this encoder was not fitted with.
    pub fn encode<S: AsRef<str>>(&self, path: &Path, labels: &[S]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.classes
                    .iter()
                    .position(|c| c == label)
                    .ok_or_else(|| SweepErr::UnknownLabel {
                        path: path.to_path_buf(),
                        label: label.to_string(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_labels_sort_numerically() {
        let encoder = LabelEncoder::fit(&["10", "2", "1", "2"]);
        assert_eq!(encoder.classes(), ["1", "2", "10"]);
        assert_eq!(encoder.num_classes(), 3);
    }

    #[test]
    fn text_labels_sort_lexicographically() {
        let encoder = LabelEncoder::fit(&["yes", "no", "maybe"]);
        let encoded = encoder.encode(Path::new("t.csv"), &["no", "yes"]).unwrap();

        assert_eq!(encoder.classes(), ["maybe", "no", "yes"]);
        assert_eq!(encoded, vec![1, 2]);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let encoder = LabelEncoder::fit(&["0", "1"]);
        let err = encoder.encode(Path::new("t.csv"), &["0", "2"]).unwrap_err();

        match err {
            SweepErr::UnknownLabel { label, .. } => assert_eq!(label, "2"),
            other => panic!("unexpected error {other}"),
        }
    }
}

use std::path::Path;

use log::{debug, info};
use machine_learning::dataset::Dataset;
use rand::{Rng, seq::SliceRandom};

use super::{LabelEncoder, Records, load_records};
use crate::{Result, SweepErr, configs::DataConfig};

/// The datasets of one sweep cell.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    /// Loaded and checked against the target files, never trained on.
    pub source_train: Dataset,
    pub train: Dataset,
    pub validation: Dataset,
    pub test: Dataset,
    pub encoder: LabelEncoder,
}

impl DatasetSplit {
    pub fn n_features(&self) -> usize {
        self.train.n_features()
    }

    pub fn num_classes(&self) -> usize {
        self.encoder.num_classes()
    }
}

/// Partitions a target training file into train and validation sets.
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    fraction: f32,
    stratify: bool,
}

impl Splitter {
    pub fn new(fraction: f32, stratify: bool) -> Self {
        Self { fraction, stratify }
    }

    /// Splits `labels` into `(train, validation)` row indices, both ascending.
    ///
    /// The validation set takes `round(n * fraction)` rows chosen after shuffling with `rng`, or
    /// that many rows out of every class when stratifying.
    ///
    /// # Returns
    /// An error if either side would end up empty.
    pub fn split_indices<R: Rng>(
        &self,
        labels: &[usize],
        rng: &mut R,
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        let groups: Vec<Vec<usize>> = if self.stratify {
            let n_classes = labels.iter().max().map_or(0, |&max| max + 1);
            let mut groups = vec![Vec::new(); n_classes];
            for (i, &label) in labels.iter().enumerate() {
                groups[label].push(i);
            }
            groups
        } else {
            vec![(0..labels.len()).collect()]
        };

        let mut train = Vec::with_capacity(labels.len());
        let mut validation = Vec::new();

        for mut group in groups {
            group.shuffle(rng);
            let n_val = (group.len() as f32 * self.fraction).round() as usize;
            validation.extend_from_slice(&group[..n_val]);
            train.extend_from_slice(&group[n_val..]);
        }

        if train.is_empty() || validation.is_empty() {
            return Err(SweepErr::SplitTooSmall {
                samples: labels.len(),
                fraction: self.fraction,
            });
        }

        train.sort_unstable();
        validation.sort_unstable();
        Ok((train, validation))
    }

    /// Loads every file of a sweep cell and builds its datasets.
    ///
    /// Labels are encoded with the classes of the target training file, every other file must
    /// share its feature columns.
    pub fn prepare<R: Rng>(
        &self,
        data: &DataConfig,
        target_train_path: &Path,
        rng: &mut R,
    ) -> Result<DatasetSplit> {
        let target = load_records(target_train_path, &data.label_key)?;
        let source = load_records(&data.source_train_path, &data.label_key)?;
        let test = load_records(&data.target_test_path, &data.label_key)?;

        let encoder = LabelEncoder::fit(&target.labels);
        debug!("classes of {}: {:?}", target.path.display(), encoder.classes());

        let expected = target.n_features();
        let source_train = to_dataset(source, &encoder, expected)?;
        let test = to_dataset(test, &encoder, expected)?;
        let target = to_dataset(target, &encoder, expected)?;

        let (train_idx, val_idx) = self.split_indices(target.labels(), rng)?;
        let train = target.subset(&train_idx)?;
        let validation = target.subset(&val_idx)?;

        info!(
            "{}: {} train, {} validation, {} test samples, {} classes",
            target_train_path.display(),
            train.len(),
            validation.len(),
            test.len(),
            encoder.num_classes()
        );

        Ok(DatasetSplit {
            source_train,
            train,
            validation,
            test,
            encoder,
        })
    }
}

fn to_dataset(records: Records, encoder: &LabelEncoder, n_features: usize) -> Result<Dataset> {
    let got = records.n_features();
    if got != n_features {
        return Err(SweepErr::FeatureMismatch {
            path: records.path,
            got,
            expected: n_features,
        });
    }

    let labels = encoder.encode(&records.path, &records.labels)?;
    Ok(Dataset::from_rows(records.features, labels)?)
}

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ModelConfig, TrainingConfig};
use crate::{Result, SweepErr};

/// Largest seed drawn when the seeds are generated.
pub const MAX_RANDOM_SEED: u64 = 100_000;

/// Where the tabular inputs live and how they are split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub source_train_path: PathBuf,
    /// Directory holding one `<dataset id>.csv` per target training set.
    pub target_train_dir: PathBuf,
    pub target_test_path: PathBuf,
    pub label_key: String,
    pub validation_split: f32,
    /// Carve the validation split out of every class separately.
    pub stratify: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source_train_path: PathBuf::from(
                "data/synthetic_data_v2/source_train/findings_final_0814_seed1591536269_size10000.csv",
            ),
            target_train_dir: PathBuf::from("data/synthetic_data_v2/target_train"),
            target_test_path: PathBuf::from(
                "data/synthetic_data_v2/target_test/findings_final_0814_seed-1494714102_size10000.csv",
            ),
            label_key: "diagnosis".into(),
            validation_split: 0.125,
            stratify: false,
        }
    }
}

impl DataConfig {
    pub fn target_train_path(&self, dataset_id: &str) -> PathBuf {
        self.target_train_dir.join(format!("{dataset_id}.csv"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedSeeds {
    Random { count: usize },
}

/// The seeds every dataset is trained with, either listed or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedsConfig {
    List(Vec<u64>),
    Generated(GeneratedSeeds),
}

impl Default for SeedsConfig {
    fn default() -> Self {
        Self::List(vec![14942, 43277, 79280, 8463, 12650])
    }
}

impl SeedsConfig {
    /// Resolves the seeds of the sweep, drawing generated ones from `rng`.
    ///
    /// Generated seeds are distinct and lie in `0..=MAX_RANDOM_SEED`, in the order they were drawn.
    pub fn resolve<R: Rng>(&self, rng: &mut R) -> Result<Vec<u64>> {
        match self {
            Self::List(seeds) => Ok(seeds.clone()),
            Self::Generated(GeneratedSeeds::Random { count }) => {
                let count = *count;
                if count as u64 > MAX_RANDOM_SEED + 1 {
                    return Err(SweepErr::InvalidConfig(format!(
                        "cannot draw {count} distinct seeds from 0..={MAX_RANDOM_SEED}"
                    )));
                }

                let mut drawn = BTreeSet::new();
                let mut seeds = Vec::with_capacity(count);
                while seeds.len() < count {
                    let seed = rng.random_range(0..=MAX_RANDOM_SEED);
                    if drawn.insert(seed) {
                        seeds.push(seed);
                    }
                }

                Ok(seeds)
            }
        }
    }
}

/// Everything one invocation of the harness needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
    pub checkpoint_dir: PathBuf,
    pub results_path: PathBuf,
    pub dataset_ids: Vec<String>,
    pub seeds: SeedsConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let dataset_ids = [
            "findings_final_0814_seed2132231585_size10000",
            "findings_final_0814_seed-190708218_size5000",
            "findings_final_0814_seed-1872107095_size4000",
            "findings_final_0814_seed678668699_size3000",
            "findings_final_0814_seed1033059257_size2000",
            "findings_final_0814_seed238506806_size1000",
            "findings_final_0814_seed-972126700_size500",
            "findings_final_0814_seed-1133351443_size400",
            "findings_final_0814_seed-1227021050_size300",
            "findings_final_0814_seed756906437_size200",
            "findings_final_0814_seed-1331694080_size100",
            "findings_final_0814_seed-53154026_size50",
        ];

        Self {
            training: TrainingConfig::default(),
            model: ModelConfig::default(),
            data: DataConfig::default(),
            checkpoint_dir: PathBuf::from("results/learned_model/learned_target_model"),
            results_path: PathBuf::from("results/accuracy/targetModel_log4.txt"),
            dataset_ids: dataset_ids.into_iter().map(String::from).collect(),
            seeds: SeedsConfig::default(),
        }
    }
}

/// The configuration of a single sweep cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub dataset_id: String,
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

impl RunConfig {
    pub fn target_train_path(&self) -> PathBuf {
        self.data.target_train_path(&self.dataset_id)
    }
}

impl SweepConfig {
    /// Reads and validates a json configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parses and validates a json configuration, missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Derives the configuration of the cell `(dataset_id, seed)`.
    pub fn cell(&self, dataset_id: &str, seed: Option<u64>) -> RunConfig {
        RunConfig {
            dataset_id: dataset_id.to_string(),
            training: self.training.with_seed(seed),
            model: self.model.clone(),
            data: self.data.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        self.validate_training()?;
        self.validate_model()?;
        self.validate_data()?;
        self.validate_grid()
    }

    fn validate_training(&self) -> Result<()> {
        let training = &self.training;

        if training.epochs == 0 {
            return Err(invalid("epochs must be greater than 0"));
        }
        if training.batch_size == 0 {
            return Err(invalid("batch_size must be greater than 0"));
        }
        if training.iters_per_epoch == 0 {
            return Err(invalid("iters_per_epoch must be greater than 0"));
        }
        if !(training.lr.is_finite() && training.lr > 0.) {
            return Err(invalid(format!("lr must be positive, got {}", training.lr)));
        }
        if !(0. ..1.).contains(&training.momentum) {
            return Err(invalid(format!(
                "momentum must lie in [0, 1), got {}",
                training.momentum
            )));
        }
        if !(training.weight_decay.is_finite() && training.weight_decay >= 0.) {
            return Err(invalid(format!(
                "weight_decay must be non-negative, got {}",
                training.weight_decay
            )));
        }
        Ok(())
    }

    fn validate_model(&self) -> Result<()> {
        if let Some(i) = self.model.hidden.iter().position(|&width| width == 0) {
            return Err(invalid(format!("hidden layer {i} has width 0")));
        }
        Ok(())
    }

    fn validate_data(&self) -> Result<()> {
        let split = self.data.validation_split;
        if !(split > 0. && split < 1.) {
            return Err(invalid(format!(
                "validation_split must lie in (0, 1), got {split}"
            )));
        }
        if self.data.label_key.is_empty() {
            return Err(invalid("label_key must not be empty"));
        }
        Ok(())
    }

    fn validate_grid(&self) -> Result<()> {
        if self.dataset_ids.is_empty() {
            return Err(invalid("at least one dataset id is required"));
        }
        if let Some(id) = self.dataset_ids.iter().find(|id| id.is_empty()) {
            return Err(invalid(format!("dataset id {id:?} is empty")));
        }
        match &self.seeds {
            SeedsConfig::List(seeds) if seeds.is_empty() => {
                Err(invalid("at least one seed is required"))
            }
            SeedsConfig::Generated(GeneratedSeeds::Random { count: 0 }) => {
                Err(invalid("at least one seed is required"))
            }
            _ => Ok(()),
        }
    }
}

fn invalid(msg: impl Into<String>) -> SweepErr {
    SweepErr::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn defaults_reproduce_the_study_grid() {
        let config = SweepConfig::default();

        assert_eq!(config.dataset_ids.len(), 12);
        assert_eq!(
            config.seeds,
            SeedsConfig::List(vec![14942, 43277, 79280, 8463, 12650])
        );
        assert_eq!(config.data.label_key, "diagnosis");
        assert_eq!(config.data.validation_split, 0.125);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_config() {
        let raw = r#"{
            "training": { "epochs": 2, "iters_per_epoch": 5 },
            "model": { "hidden": [16] },
            "data": { "target_train_dir": "in", "stratify": true },
            "dataset_ids": ["a", "b"],
            "seeds": [1, 2, 3]
        }"#;
        let config = SweepConfig::from_json(raw).unwrap();

        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.model.hidden, vec![16]);
        assert!(config.data.stratify);
        assert_eq!(config.data.target_train_path("a"), PathBuf::from("in/a.csv"));
        assert_eq!(config.seeds, SeedsConfig::List(vec![1, 2, 3]));
    }

    #[test]
    fn parses_generated_seeds() {
        let raw = r#"{ "seeds": { "random": { "count": 4 } } }"#;
        let config = SweepConfig::from_json(raw).unwrap();

        assert_eq!(
            config.seeds,
            SeedsConfig::Generated(GeneratedSeeds::Random { count: 4 })
        );
    }

    #[test]
    fn generated_seeds_are_distinct_and_bounded() {
        let seeds = SeedsConfig::Generated(GeneratedSeeds::Random { count: 50 });
        let resolved = seeds.resolve(&mut StdRng::seed_from_u64(0)).unwrap();

        let distinct: BTreeSet<_> = resolved.iter().collect();
        assert_eq!(resolved.len(), 50);
        assert_eq!(distinct.len(), 50);
        assert!(resolved.iter().all(|&s| s <= MAX_RANDOM_SEED));
    }

    #[test]
    fn too_many_generated_seeds_is_an_error() {
        let seeds = SeedsConfig::Generated(GeneratedSeeds::Random {
            count: MAX_RANDOM_SEED as usize + 2,
        });
        let resolved = seeds.resolve(&mut StdRng::seed_from_u64(0));

        assert!(matches!(resolved, Err(SweepErr::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            r#"{ "training": { "epochs": 0 } }"#,
            r#"{ "training": { "batch_size": 0 } }"#,
            r#"{ "training": { "iters_per_epoch": 0 } }"#,
            r#"{ "training": { "momentum": 1.0 } }"#,
            r#"{ "data": { "validation_split": 0.0 } }"#,
            r#"{ "data": { "validation_split": 1.0 } }"#,
            r#"{ "model": { "hidden": [8, 0] } }"#,
            r#"{ "dataset_ids": [] }"#,
            r#"{ "seeds": [] }"#,
        ];

        for raw in cases {
            let parsed = SweepConfig::from_json(raw);
            assert!(
                matches!(parsed, Err(SweepErr::InvalidConfig(_))),
                "{raw} was accepted"
            );
        }
    }

    #[test]
    fn cell_overrides_only_id_and_seed() {
        let config = SweepConfig::default();
        let cell = config.cell("x", Some(9));

        assert_eq!(cell.dataset_id, "x");
        assert_eq!(cell.training.seed, Some(9));
        assert_eq!(cell.training.epochs, config.training.epochs);
        assert_eq!(
            cell.target_train_path(),
            config.data.target_train_dir.join("x.csv")
        );
    }
}

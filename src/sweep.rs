use std::fs;

use log::info;

use crate::{
    Result, SweepErr,
    checkpoint::checkpoint_path,
    configs::SweepConfig,
    results::{ResultRow, ResultsLog},
    run::{CellRunner, TrainingRunner},
};

/// Runs a training run for every `(dataset id, seed)` pair of a configuration, dataset-major and
/// seed-minor, logging one row per finished run.
pub struct Sweep<'a> {
    config: &'a SweepConfig,
    seeds: Vec<u64>,
}

impl<'a> Sweep<'a> {
    /// Creates a new `Sweep`, `seeds` being the resolved seeds of `config`.
    pub fn new(config: &'a SweepConfig, seeds: Vec<u64>) -> Self {
        Self { config, seeds }
    }

    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    /// Runs every cell with the default training runner.
    pub fn run(&self) -> Result<Vec<ResultRow>> {
        self.run_with(&mut TrainingRunner)
    }

    /// Runs every cell with `runner`, strictly one after the other.
    ///
    /// The results log is truncated first and every row is flushed as soon as its run finishes.
    ///
    /// # Returns
    /// The rows in the order they were written, or the first error, in which case the rows
    /// already written stay in the log.
    pub fn run_with<R: CellRunner>(&self, runner: &mut R) -> Result<Vec<ResultRow>> {
        self.config.validate()?;
        if self.seeds.is_empty() {
            return Err(SweepErr::InvalidConfig(
                "at least one seed is required".into(),
            ));
        }

        fs::create_dir_all(&self.config.checkpoint_dir)?;
        let mut log = ResultsLog::create(&self.config.results_path)?;

        let total = self.config.dataset_ids.len() * self.seeds.len();
        let mut rows = Vec::with_capacity(total);

        for dataset_id in &self.config.dataset_ids {
            info!("{dataset_id}");

            for (seed_index, &seed) in self.seeds.iter().enumerate() {
                let cell = self.config.cell(dataset_id, Some(seed));
                let path = checkpoint_path(&self.config.checkpoint_dir, dataset_id, Some(seed));

                let outcome = runner.run_cell(&cell, &path)?;
                let row = ResultRow {
                    dataset_id: dataset_id.clone(),
                    seed_index,
                    seed: Some(seed),
                    validation_accuracy: outcome.best_validation_accuracy,
                    test_accuracy: outcome.test_accuracy,
                };

                log.append(&row)?;
                info!("{row}");
                rows.push(row);
            }
        }

        info!(
            "{} of {total} runs written to {}",
            rows.len(),
            log.path().display()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::*;
    use crate::{configs::RunConfig, run::RunOutcome};

    /// Reports the seed as validation accuracy and fails on a given cell.
    #[derive(Default)]
    struct FakeRunner {
        calls: Vec<(String, Option<u64>, PathBuf)>,
        fail_at: Option<usize>,
    }

    impl CellRunner for FakeRunner {
        fn run_cell(&mut self, config: &RunConfig, checkpoint_path: &Path) -> Result<RunOutcome> {
            if self.fail_at == Some(self.calls.len()) {
                return Err(SweepErr::NoCheckpoint {
                    path: checkpoint_path.to_path_buf(),
                });
            }

            self.calls.push((
                config.dataset_id.clone(),
                config.training.seed,
                checkpoint_path.to_path_buf(),
            ));

            let seed = config.training.seed.unwrap_or_default() as f32;
            Ok(RunOutcome {
                best_validation_accuracy: seed,
                best_epoch: 0,
                reloaded_validation_accuracy: seed,
                test_accuracy: 50.,
                validation_history: vec![seed],
            })
        }
    }

    fn config(dir: &TempDir) -> SweepConfig {
        SweepConfig {
            checkpoint_dir: dir.path().join("ckpt"),
            results_path: dir.path().join("results").join("log.txt"),
            dataset_ids: vec!["a".into(), "b".into()],
            ..Default::default()
        }
    }

    #[test]
    fn cells_run_dataset_major() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut runner = FakeRunner::default();

        let rows = Sweep::new(&config, vec![10, 20]).run_with(&mut runner).unwrap();

        let order: Vec<_> = runner
            .calls
            .iter()
            .map(|(id, seed, _)| (id.as_str(), *seed))
            .collect();
        assert_eq!(
            order,
            [
                ("a", Some(10)),
                ("a", Some(20)),
                ("b", Some(10)),
                ("b", Some(20))
            ]
        );
        assert_eq!(runner.calls[3].2, dir.path().join("ckpt").join("b_20.safetensors"));
        assert_eq!(rows[1].seed_index, 1);
        assert_eq!(rows[1].validation_accuracy, 20.);

        let log = fs::read_to_string(&config.results_path).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "target_train_path,seed_index,seed,validate_acc,test_acc");
        assert_eq!(lines[3], "b,0,10,10,50");
    }

    #[test]
    fn failed_cell_keeps_earlier_rows() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut runner = FakeRunner {
            fail_at: Some(2),
            ..Default::default()
        };

        let err = Sweep::new(&config, vec![1, 2]).run_with(&mut runner).unwrap_err();

        assert!(matches!(err, SweepErr::NoCheckpoint { .. }));
        let log = fs::read_to_string(&config.results_path).unwrap();
        assert_eq!(log.lines().count(), 3);
    }

    #[test]
    fn invalid_config_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.training.epochs = 0;

        let err = Sweep::new(&config, vec![1]).run_with(&mut FakeRunner::default()).unwrap_err();

        assert!(matches!(err, SweepErr::InvalidConfig(_)));
        assert!(!config.results_path.exists());
    }

    #[test]
    fn empty_seed_list_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut runner = FakeRunner::default();

        let err = Sweep::new(&config, vec![]).run_with(&mut runner).unwrap_err();

        assert!(matches!(err, SweepErr::InvalidConfig(_)));
        assert!(runner.calls.is_empty());
        assert!(!config.results_path.exists());
    }
}

use std::{
    cell::RefCell,
    fmt, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, info, warn};
use machine_learning::{
    arch::{Sequential, loss::CrossEntropy},
    data::{DataLoader, ForeverDataIterator},
    initialization::init_params,
    optimization::{Optimizer, Sgd, StepwiseLr},
    training::ModelTrainer,
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Result, SweepErr,
    checkpoint::{self, CheckpointMeta},
    configs::RunConfig,
    data::{DatasetSplit, Splitter},
};

type Trainer = ModelTrainer<Sequential, Sgd, StepwiseLr, CrossEntropy>;

/// The phases a run goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    TrainingEpoch(usize),
    ReloadBest,
    FinalEval,
    Done,
}

/// What a finished run reports.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// The highest validation accuracy of any epoch.
    pub best_validation_accuracy: f32,
    /// The first epoch reaching `best_validation_accuracy`.
    pub best_epoch: usize,
    /// Validation accuracy of the parameters read back from the checkpoint.
    pub reloaded_validation_accuracy: f32,
    pub test_accuracy: f32,
    /// Validation accuracy after every epoch.
    pub validation_history: Vec<f32>,
}

/// Runs a single sweep cell to completion.
pub trait CellRunner {
    fn run_cell(&mut self, config: &RunConfig, checkpoint_path: &Path) -> Result<RunOutcome>;
}

/// Trains, selects and tests a model for every cell it's given.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrainingRunner;

impl CellRunner for TrainingRunner {
    fn run_cell(&mut self, config: &RunConfig, checkpoint_path: &Path) -> Result<RunOutcome> {
        RunController::new(config.clone(), checkpoint_path).run()
    }
}

/// Drives one training run: trains for the configured epochs, keeps the checkpoint of the best
/// validation epoch and reports the test accuracy of that checkpoint.
pub struct RunController {
    config: RunConfig,
    checkpoint_path: PathBuf,
    state: RunState,
}

struct Best {
    epoch: usize,
    accuracy: f32,
    params: Vec<f32>,
}

/// Everything a run owns between `Init` and `Done`.
struct ActiveRun {
    trainer: Trainer,
    params: Vec<f32>,
    stream: ForeverDataIterator,
    val_loader: DataLoader,
    test_loader: DataLoader,
    best: Option<Best>,
    history: Vec<f32>,
}

impl RunController {
    pub fn new<P: Into<PathBuf>>(config: RunConfig, checkpoint_path: P) -> Self {
        Self {
            config,
            checkpoint_path: checkpoint_path.into(),
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Runs every phase in order.
    ///
    /// # Returns
    /// The outcome of the run, or the first error any phase ran into. A run whose validation
    /// accuracy never rose above zero fails with `SweepErr::NoCheckpoint`.
    pub fn run(&mut self) -> Result<RunOutcome> {
        let mut run = self.init()?;

        for epoch in 0..self.config.training.epochs {
            self.enter(RunState::TrainingEpoch(epoch));
            self.training_epoch(&mut run, epoch)?;
        }

        self.enter(RunState::ReloadBest);
        let (best, reloaded_validation_accuracy) = self.reload_best(&mut run)?;

        self.enter(RunState::FinalEval);
        let test = run.trainer.evaluate(&mut run.test_loader, &run.params)?;

        self.enter(RunState::Done);
        Ok(RunOutcome {
            best_validation_accuracy: best.accuracy,
            best_epoch: best.epoch,
            reloaded_validation_accuracy,
            test_accuracy: test.accuracy,
            validation_history: run.history,
        })
    }

    fn enter(&mut self, state: RunState) {
        debug!("{self}: {:?} -> {state:?}", self.state);
        self.state = state;
    }

    fn init(&self) -> Result<ActiveRun> {
        let training = &self.config.training;
        let data = &self.config.data;

        let mut rng = match training.seed {
            Some(seed) => {
                warn!(
                    "You have chosen to seed training with {seed}, \
                     every kernel runs single threaded so the run is reproducible"
                );
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };
        let mut split_rng = StdRng::from_rng(&mut rng);
        let init_rng = StdRng::from_rng(&mut rng);
        let shuffle_rng = StdRng::from_rng(&mut rng);

        let DatasetSplit {
            source_train,
            train,
            validation,
            test,
            encoder,
        } = Splitter::new(data.validation_split, data.stratify).prepare(
            data,
            &self.config.target_train_path(),
            &mut split_rng,
        )?;
        debug!(
            "{} source samples loaded and left out of training",
            source_train.len()
        );

        let batch_size = NonZeroUsize::new(training.batch_size)
            .ok_or_else(|| SweepErr::InvalidConfig("batch_size must be greater than 0".into()))?;

        let n_features = train.n_features();
        let train_loader = DataLoader::new(train, batch_size)
            .shuffled(shuffle_rng)
            .drop_last(true)
            .workers(training.workers)?;
        let stream = ForeverDataIterator::new(train_loader)?;
        let val_loader = DataLoader::new(validation, batch_size).workers(training.workers)?;
        let test_loader = DataLoader::new(test, batch_size).workers(training.workers)?;

        let model = self.config.model.build(n_features, encoder.num_classes());
        let params = init_params(&model, Rc::new(RefCell::new(init_rng)))?;
        let optimizer = Sgd::new(
            params.len(),
            training.lr,
            training.momentum,
            training.weight_decay,
            true,
        );
        let schedule = StepwiseLr::new(
            training.lr,
            StepwiseLr::DEFAULT_GAMMA,
            StepwiseLr::DEFAULT_DECAY_RATE,
        );
        let trainer = ModelTrainer::new(
            model,
            optimizer,
            schedule,
            CrossEntropy::new(),
            training.iters_per_epoch,
            training.print_freq,
        );

        if let Some(dir) = self.checkpoint_path.parent() {
            fs::create_dir_all(dir)?;
        }
        if checkpoint::remove_stale(&self.checkpoint_path)? {
            info!(
                "removed stale checkpoint {}",
                self.checkpoint_path.display()
            );
        }

        Ok(ActiveRun {
            trainer,
            params,
            stream,
            val_loader,
            test_loader,
            best: None,
            history: Vec::with_capacity(training.epochs),
        })
    }

    fn training_epoch(&self, run: &mut ActiveRun, epoch: usize) -> Result<()> {
        let stats = run
            .trainer
            .train_epoch(&mut run.stream, &mut run.params, epoch)?;
        let val = run.trainer.evaluate(&mut run.val_loader, &run.params)?;
        run.history.push(val.accuracy);

        let best_accuracy = run.best.as_ref().map_or(0., |best| best.accuracy);
        if val.accuracy > best_accuracy {
            let meta = CheckpointMeta {
                dataset_id: self.config.dataset_id.clone(),
                seed: self.config.training.seed,
                epoch,
                validation_accuracy: val.accuracy,
            };
            checkpoint::save(
                &self.checkpoint_path,
                run.trainer.model(),
                &run.params,
                &meta,
            )?;

            run.best = Some(Best {
                epoch,
                accuracy: val.accuracy,
                params: run.params.clone(),
            });
        }

        info!(
            "{self} epoch {epoch}: loss {:.4}, lr {:.5}, acc1 {:.3}, best {:.3}",
            stats.avg_loss,
            run.trainer.optimizer().learning_rate(),
            val.accuracy,
            best_accuracy.max(val.accuracy)
        );
        Ok(())
    }

    /// Swaps the current parameters for the ones in the checkpoint.
    ///
    /// # Returns
    /// The best epoch and the validation accuracy of the reloaded parameters.
    fn reload_best(&self, run: &mut ActiveRun) -> Result<(Best, f32)> {
        let best = run.best.take().ok_or_else(|| SweepErr::NoCheckpoint {
            path: self.checkpoint_path.clone(),
        })?;

        let params = checkpoint::load(&self.checkpoint_path, run.trainer.model())?;
        if params != best.params {
            warn!(
                "{} differs from the parameters of epoch {}, using the file",
                self.checkpoint_path.display(),
                best.epoch
            );
        }
        run.params = params;

        let reloaded = run.trainer.evaluate(&mut run.val_loader, &run.params)?;
        if reloaded.accuracy != best.accuracy {
            warn!(
                "reloaded checkpoint scores {:.3} on validation, epoch {} scored {:.3}",
                reloaded.accuracy, best.epoch, best.accuracy
            );
        }

        Ok((best, reloaded.accuracy))
    }
}

impl fmt::Display for RunController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.config.training.seed {
            Some(seed) => write!(f, "[{} seed {seed}]", self.config.dataset_id),
            None => write!(f, "[{} unseeded]", self.config.dataset_id),
        }
    }
}

use std::time::{Duration, Instant};

use super::{AverageMeter, EvalStats, ProgressMeter, evaluate};
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    data::{DataLoader, ForeverDataIterator},
    optimization::{LrSchedule, Optimizer},
};

/// Running statistics of one training epoch, only meant for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub steps: usize,
    pub avg_loss: f32,
    pub batch_time: Duration,
    pub data_time: Duration,
}

/// A model `Trainer`. Contains the relevant components needed for training a model, including
/// the model itself, but not its parameters.
pub struct ModelTrainer<M, O, S, L>
where
    M: Model,
    O: Optimizer,
    S: LrSchedule,
    L: LossFn,
{
    model: M,
    optimizer: O,
    schedule: S,
    loss_fn: L,
    grad: Vec<f32>,

    iters_per_epoch: usize,
    print_freq: usize,
}

impl<M, O, S, L> ModelTrainer<M, O, S, L>
where
    M: Model,
    O: Optimizer,
    S: LrSchedule,
    L: LossFn,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer that dictates how to update the parameters on each step.
    /// * `schedule` - The learning rate schedule, advanced once per step.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `iters_per_epoch` - The amount of optimization steps per epoch.
    /// * `print_freq` - Every how many steps a progress line is logged.
    pub fn new(
        model: M,
        optimizer: O,
        schedule: S,
        loss_fn: L,
        iters_per_epoch: usize,
        print_freq: usize,
    ) -> Self {
        let grad = vec![0.; model.size()];

        Self {
            model,
            optimizer,
            schedule,
            loss_fn,
            grad,
            iters_per_epoch,
            print_freq: print_freq.max(1),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Performs exactly `iters_per_epoch` optimization steps drawing batches from `stream`.
    ///
    /// Each step advances the learning rate schedule, draws a batch, computes the mean loss,
    /// backpropagates and updates `params` in place.
    ///
    /// # Arguments
    /// * `stream` - The endless stream of training batches.
    /// * `params` - The model's parameters.
    /// * `epoch` - The index of this epoch, only used for logging.
    ///
    /// # Returns
    /// The epoch statistics or an error if a pass failed or the loss stopped being finite.
    pub fn train_epoch(
        &mut self,
        stream: &mut ForeverDataIterator,
        params: &mut [f32],
        epoch: usize,
    ) -> Result<EpochStats> {
        let mut batch_time = AverageMeter::new("Time", 2);
        let mut data_time = AverageMeter::new("Data", 2);
        let mut losses = AverageMeter::new("Loss", 2);
        let progress = ProgressMeter::new(self.iters_per_epoch, format!("Epoch: [{epoch}]"));

        let mut total_batch = Duration::ZERO;
        let mut total_data = Duration::ZERO;
        let mut end = Instant::now();

        for i in 0..self.iters_per_epoch {
            self.schedule.step(&mut self.optimizer);

            let batch = stream.next_batch();
            let elapsed = end.elapsed();
            total_data += elapsed;
            data_time.update(elapsed.as_secs_f32(), 1);

            let output = self.model.forward(params, batch.x.view())?;
            let loss = self.loss_fn.loss(output.view(), &batch.y)?;

            if !loss.is_finite() {
                return Err(MlErr::Diverged { step: i, loss });
            }

            losses.update(loss, batch.len());

            let d = self.loss_fn.loss_prime(output.view(), &batch.y)?;
            self.grad.fill(0.);
            self.model.backward(params, &mut self.grad, d)?;
            self.optimizer.update_params(&self.grad, params)?;

            let elapsed = end.elapsed();
            total_batch += elapsed;
            batch_time.update(elapsed.as_secs_f32(), 1);
            end = Instant::now();

            if i % self.print_freq == 0 {
                progress.display(i, &[&batch_time, &data_time, &losses]);
            }
        }

        let steps = self.iters_per_epoch.max(1) as u32;

        Ok(EpochStats {
            steps: self.iters_per_epoch,
            avg_loss: losses.avg(),
            batch_time: total_batch / steps,
            data_time: total_data / steps,
        })
    }

    /// Evaluates the model on `loader`, see [`evaluate`].
    pub fn evaluate(&mut self, loader: &mut DataLoader, params: &[f32]) -> Result<EvalStats> {
        evaluate(&mut self.model, params, loader, &self.loss_fn, self.print_freq)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Sequential, activations::ActFn, layers::Layer, loss::CrossEntropy},
        dataset::Dataset,
        optimization::{Sgd, StepwiseLr},
    };

    /// Two well separated blobs: class 0 around (-1, -1) and class 1 around (1, 1).
    fn blobs(n: usize) -> Dataset {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            let center = if i % 2 == 0 { -1. } else { 1. };
            center + 0.1 * (((i * 7 + j * 3) % 5) as f32 - 2.)
        });
        let labels = (0..n).map(|i| i % 2).collect();
        Dataset::new(features, labels).unwrap()
    }

    fn trainer(size: usize) -> ModelTrainer<Sequential, Sgd, StepwiseLr, CrossEntropy> {
        let model = Sequential::new([
            Layer::dense((2, 8), Some(ActFn::relu())),
            Layer::dense((8, 2), None),
        ]);
        let sgd = Sgd::new(size, 0.1, 0.9, 1e-3, true);
        let schedule = StepwiseLr::new(0.1, 0.001, 0.75);
        ModelTrainer::new(model, sgd, schedule, CrossEntropy, 20, 10)
    }

    #[test]
    fn learns_separable_blobs() {
        let model_size = (2 + 1) * 8 + (8 + 1) * 2;
        let mut params: Vec<f32> = (0..model_size).map(|i| ((i as f32) * 1.3).sin() * 0.3).collect();
        let mut trainer = trainer(model_size);

        let loader = DataLoader::new(blobs(40), NonZeroUsize::new(8).unwrap())
            .shuffled(StdRng::seed_from_u64(0))
            .drop_last(true);
        let mut stream = ForeverDataIterator::new(loader).unwrap();
        let mut eval_loader = DataLoader::new(blobs(40), NonZeroUsize::new(16).unwrap());

        let mut first = None;
        let mut last = None;
        for epoch in 0..5 {
            let stats = trainer.train_epoch(&mut stream, &mut params, epoch).unwrap();
            assert_eq!(stats.steps, 20);
            first.get_or_insert(stats.avg_loss);
            last = Some(stats.avg_loss);
        }

        assert!(last.unwrap() < first.unwrap());

        let eval = trainer.evaluate(&mut eval_loader, &params).unwrap();
        assert_eq!(eval.accuracy, 100.);
    }

    #[test]
    fn schedule_advances_once_per_step() {
        let model_size = (2 + 1) * 8 + (8 + 1) * 2;
        let mut params = vec![0.01; model_size];
        let mut trainer = trainer(model_size);

        let loader = DataLoader::new(blobs(8), NonZeroUsize::new(4).unwrap()).drop_last(true);
        let mut stream = ForeverDataIterator::new(loader).unwrap();

        trainer.train_epoch(&mut stream, &mut params, 0).unwrap();

        // 20 steps over 2 batches per pass
        assert_eq!(stream.passes(), 9);
        let expected = 0.1 * (1. + 0.001 * 19.0f32).powf(-0.75);
        assert!((trainer.optimizer().learning_rate() - expected).abs() < 1e-7);
    }
}

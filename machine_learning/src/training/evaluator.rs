use std::time::Instant;

use super::{AverageMeter, ProgressMeter, accuracy, correct};
use crate::{
    Result,
    arch::{Model, loss::LossFn},
    data::DataLoader,
};

/// The outcome of a full evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalStats {
    /// Top-1 accuracy over every sample, as a percentage.
    pub accuracy: f32,
    /// Mean loss over every sample.
    pub loss: f32,
    pub samples: usize,
}

/// Runs one full pass over `loader` in inference mode.
///
/// The loader is restarted first so every sample is visited exactly once, in the loader's order.
/// The parameters are only read. Both the accuracy and the loss are weighted by batch size, so a
/// short last batch counts exactly as much as its samples.
///
/// # Arguments
/// * `model` - The model to evaluate.
/// * `params` - The model's parameters.
/// * `loader` - The batches to evaluate on.
/// * `loss_fn` - The loss function.
/// * `print_freq` - Every how many batches a progress line is logged.
///
/// # Returns
/// The evaluation statistics or an error if the model failed to make a forward pass.
pub fn evaluate<M, L>(
    model: &mut M,
    params: &[f32],
    loader: &mut DataLoader,
    loss_fn: &L,
    print_freq: usize,
) -> Result<EvalStats>
where
    M: Model,
    L: LossFn,
{
    let mut batch_time = AverageMeter::new("Time", 3);
    let mut losses = AverageMeter::new("Loss", 4);
    let mut top1 = AverageMeter::new("Acc@1", 2);
    let progress = ProgressMeter::new(loader.len(), "Test: ");

    let mut hits = 0;
    let mut samples = 0;

    loader.reset();
    let mut end = Instant::now();

    for (i, batch) in loader.by_ref().enumerate() {
        let output = model.forward(params, batch.x.view())?;
        let loss = loss_fn.loss(output.view(), &batch.y)?;

        hits += correct(output.view(), &batch.y);
        samples += batch.len();

        losses.update(loss, batch.len());
        top1.update(accuracy(output.view(), &batch.y), batch.len());

        batch_time.update(end.elapsed().as_secs_f32(), 1);
        end = Instant::now();

        if i % print_freq.max(1) == 0 {
            progress.display(i, &[&batch_time, &losses, &top1]);
        }
    }

    let accuracy = if samples == 0 {
        0.
    } else {
        100. * hits as f32 / samples as f32
    };

    log::info!(" * Acc@1 {accuracy:.3}");

    Ok(EvalStats {
        accuracy,
        loss: losses.avg(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::{Array2, ArrayView2, array};

    use super::*;
    use crate::{arch::loss::CrossEntropy, dataset::Dataset};

    /// Scores class 1 for positive first features and class 0 otherwise.
    struct SignModel {
        calls: usize,
    }

    impl Model for SignModel {
        fn size(&self) -> usize {
            0
        }

        fn forward(&mut self, _: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
            self.calls += 1;
            Ok(Array2::from_shape_fn((x.nrows(), 2), |(r, c)| {
                let positive = x[[r, 0]] > 0.;
                if positive == (c == 1) { 1. } else { 0. }
            }))
        }

        fn backward(&mut self, _: &[f32], _: &mut [f32], _: Array2<f32>) -> Result<()> {
            unreachable!("evaluation never backpropagates")
        }
    }

    #[test]
    fn accuracy_is_weighted_by_batch_size() {
        // batch 1: [+, -, +] with labels [1, 1, 1] -> 2 correct
        // batch 2: [-] with label [0] -> 1 correct
        let features = array![[1.], [-1.], [2.], [-3.]];
        let dataset = Dataset::new(features, vec![1, 1, 1, 0]).unwrap();
        let mut loader = DataLoader::new(dataset, NonZeroUsize::new(3).unwrap());
        let mut model = SignModel { calls: 0 };

        let stats = evaluate(&mut model, &[], &mut loader, &CrossEntropy, 100).unwrap();

        assert_eq!(model.calls, 2);
        assert_eq!(stats.samples, 4);
        assert_eq!(stats.accuracy, 75.);
    }

    #[test]
    fn repeated_evaluation_visits_everything_again() {
        let features = array![[1.], [-1.]];
        let dataset = Dataset::new(features, vec![1, 0]).unwrap();
        let mut loader = DataLoader::new(dataset, NonZeroUsize::new(1).unwrap());
        let mut model = SignModel { calls: 0 };

        let first = evaluate(&mut model, &[], &mut loader, &CrossEntropy, 1).unwrap();
        let second = evaluate(&mut model, &[], &mut loader, &CrossEntropy, 1).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.accuracy, 100.);
        assert_eq!(model.calls, 4);
    }
}

use std::fmt::{self, Display};

use ndarray::{ArrayView2, Axis};

/// Computes and stores the average and current value of a running statistic.
#[derive(Debug, Clone)]
pub struct AverageMeter {
    name: &'static str,
    precision: usize,
    val: f32,
    sum: f32,
    count: usize,
}

impl AverageMeter {
    pub fn new(name: &'static str, precision: usize) -> Self {
        Self {
            name,
            precision,
            val: 0.,
            sum: 0.,
            count: 0,
        }
    }

    /// Records `val`, weighted by the `n` samples it was measured on.
    pub fn update(&mut self, val: f32, n: usize) {
        self.val = val;
        self.sum += val * n as f32;
        self.count += n;
    }

    pub fn val(&self) -> f32 {
        self.val
    }

    pub fn avg(&self) -> f32 {
        if self.count == 0 {
            return 0.;
        }

        self.sum / self.count as f32
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl Display for AverageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision;
        write!(f, "{} {:.p$} ({:.p$})", self.name, self.val, self.avg())
    }
}

/// Logs a line with every meter every time `display` is called.
#[derive(Debug)]
pub struct ProgressMeter {
    num_batches: usize,
    prefix: String,
}

impl ProgressMeter {
    pub fn new(num_batches: usize, prefix: impl Into<String>) -> Self {
        Self {
            num_batches,
            prefix: prefix.into(),
        }
    }

    pub fn display(&self, batch: usize, meters: &[&AverageMeter]) {
        let width = self.num_batches.to_string().len();
        let meters: Vec<_> = meters.iter().map(|m| m.to_string()).collect();

        log::info!(
            "{}[{batch:>width$}/{}]\t{}",
            self.prefix,
            self.num_batches,
            meters.join("\t")
        );
    }
}

/// The amount of rows whose highest score is at the index of their label.
pub fn correct(output: ArrayView2<f32>, target: &[usize]) -> usize {
    output
        .axis_iter(Axis(0))
        .zip(target)
        .filter(|(row, label)| argmax(row.iter().copied()) == Some(**label))
        .count()
}

/// The top-1 accuracy of a batch, as a percentage.
pub fn accuracy(output: ArrayView2<f32>, target: &[usize]) -> f32 {
    if target.is_empty() {
        return 0.;
    }

    100. * correct(output, target) as f32 / target.len() as f32
}

/// The index of the first maximum.
fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

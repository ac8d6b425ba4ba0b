use super::Optimizer;

/// A learning rate schedule driven one optimization step at a time.
pub trait LrSchedule {
    /// Applies the learning rate for the current step to `optimizer` and advances the schedule.
    fn step<O: Optimizer>(&mut self, optimizer: &mut O);
}

/// Decays the learning rate on every step following
/// `lr(i) = init_lr * (1 + gamma * i) ^ (-decay_rate)`.
#[derive(Debug, Clone)]
pub struct StepwiseLr {
    init_lr: f32,
    gamma: f32,
    decay_rate: f32,
    iter_num: usize,
}

impl StepwiseLr {
    pub const DEFAULT_GAMMA: f32 = 0.001;
    pub const DEFAULT_DECAY_RATE: f32 = 0.75;

    /// Creates a new `StepwiseLr` schedule starting at step 0.
    ///
    /// # Arguments
    /// * `init_lr` - The learning rate at step 0.
    /// * `gamma` - How fast the steps count towards the decay.
    /// * `decay_rate` - The exponent of the decay.
    pub fn new(init_lr: f32, gamma: f32, decay_rate: f32) -> Self {
        Self {
            init_lr,
            gamma,
            decay_rate,
            iter_num: 0,
        }
    }

    /// The learning rate the next `step` call applies.
    pub fn lr(&self) -> f32 {
        self.init_lr * (1. + self.gamma * self.iter_num as f32).powf(-self.decay_rate)
    }

    /// The amount of steps taken so far.
    pub fn iter_num(&self) -> usize {
        self.iter_num
    }
}

impl LrSchedule for StepwiseLr {
    fn step<O: Optimizer>(&mut self, optimizer: &mut O) {
        optimizer.set_learning_rate(self.lr());
        self.iter_num += 1;
    }
}

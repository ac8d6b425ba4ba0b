use machine_learning::arch::{Sequential, activations::ActFn, layers::Layer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnConfig {
    Relu,
    Sigmoid { amp: f32 },
}

impl From<ActFnConfig> for ActFn {
    fn from(config: ActFnConfig) -> Self {
        match config {
            ActFnConfig::Relu => ActFn::relu(),
            ActFnConfig::Sigmoid { amp } => ActFn::sigmoid(amp),
        }
    }
}

/// The shape of the classifier: a stack of dense layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Widths of the hidden layers, in order.
    pub hidden: Vec<usize>,
    /// Activation of every hidden layer, the output layer yields raw logits.
    pub act_fn: ActFnConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden: vec![64, 32],
            act_fn: ActFnConfig::Relu,
        }
    }
}

impl ModelConfig {
    /// Builds the model `in_dim -> hidden... -> out_dim`.
    pub fn build(&self, in_dim: usize, out_dim: usize) -> Sequential {
        let act_fn = ActFn::from(self.act_fn);
        let widths: Vec<_> = std::iter::once(in_dim)
            .chain(self.hidden.iter().copied())
            .chain(std::iter::once(out_dim))
            .collect();
        let last = widths.len() - 2;

        Sequential::new(widths.windows(2).enumerate().map(|(i, dim)| {
            let act_fn = (i < last).then_some(act_fn);
            Layer::dense((dim[0], dim[1]), act_fn)
        }))
    }
}

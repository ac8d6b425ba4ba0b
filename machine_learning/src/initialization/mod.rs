mod param_gen;
mod random;

use std::{cell::RefCell, rc::Rc};

use rand::Rng;

pub use param_gen::ParamGen;
pub use random::RandParamGen;

use crate::{
    MlErr, Result,
    arch::{Model, Sequential},
};

/// Generates the initial parameters of a `Sequential` model.
///
/// Every tensor (weights and biases alike) is drawn from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`
/// where `fan_in` is the amount of inputs of the layer it belongs to.
///
/// # Arguments
/// * `model` - The model to generate parameters for.
/// * `rng` - The random number generator every sample is drawn from.
///
/// # Returns
/// A flat parameter buffer of `model.size()` elements.
pub fn init_params<R: Rng>(model: &Sequential, rng: Rc<RefCell<R>>) -> Result<Vec<f32>> {
    let size = model.size();
    let mut params = Vec::with_capacity(size);

    for layer in model.layers() {
        let shapes = layer.param_shapes();
        let fan_in = shapes
            .first()
            .and_then(|(_, shape)| shape.first().copied())
            .unwrap_or(1);

        for (kind, shape) in shapes {
            let len: usize = shape.iter().product();
            let mut param_gen = RandParamGen::linear_default(rng.clone(), len, fan_in)?;
            let tensor = param_gen.sample(len).unwrap_or_default();

            if tensor.len() != len {
                return Err(MlErr::SizeMismatch {
                    what: kind,
                    got: tensor.len(),
                    expected: len,
                });
            }
            params.extend(tensor);
        }
    }

    if params.len() != size {
        return Err(MlErr::SizeMismatch {
            what: "initial parameters",
            got: params.len(),
            expected: size,
        });
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::{Model, layers::Layer};

    fn model() -> Sequential {
        Sequential::new([Layer::dense((4, 3), None), Layer::dense((3, 2), None)])
    }

    #[test]
    fn fills_every_parameter_within_bounds() {
        let model = model();
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(7)));
        let params = init_params(&model, rng).unwrap();

        assert_eq!(params.len(), model.size());

        let (first, second) = params.split_at(5 * 3);
        assert!(first.iter().all(|p| p.abs() <= 0.5));
        assert!(second.iter().all(|p| p.abs() <= 1. / 3f32.sqrt()));
    }

    #[test]
    fn same_seed_same_parameters() {
        let model = model();
        let a = init_params(&model, Rc::new(RefCell::new(StdRng::seed_from_u64(3)))).unwrap();
        let b = init_params(&model, Rc::new(RefCell::new(StdRng::seed_from_u64(3)))).unwrap();
        let c = init_params(&model, Rc::new(RefCell::new(StdRng::seed_from_u64(4)))).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

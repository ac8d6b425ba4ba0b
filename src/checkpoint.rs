use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;
use machine_learning::{
    MlErr,
    arch::{Model, Sequential},
};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{Result, SweepErr};

/// Where the best checkpoint of the cell `(dataset_id, seed)` lives.
pub fn checkpoint_path(dir: &Path, dataset_id: &str, seed: Option<u64>) -> PathBuf {
    let seed = seed.map_or_else(|| "None".to_string(), |s| s.to_string());
    dir.join(format!("{dataset_id}_{seed}.safetensors"))
}

/// What a checkpoint records besides the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMeta {
    pub dataset_id: String,
    pub seed: Option<u64>,
    pub epoch: usize,
    pub validation_accuracy: f32,
}

impl CheckpointMeta {
    fn to_metadata(&self) -> HashMap<String, String> {
        let seed = self.seed.map_or_else(|| "None".to_string(), |s| s.to_string());
        HashMap::from([
            ("dataset_id".to_string(), self.dataset_id.clone()),
            ("seed".to_string(), seed),
            ("epoch".to_string(), self.epoch.to_string()),
            (
                "validation_accuracy".to_string(),
                self.validation_accuracy.to_string(),
            ),
        ])
    }
}

/// Persists the best parameters of a model as one safetensors tensor per layer parameter.
///
/// The file is written next to its destination first and then renamed over it, so `path` always
/// holds either the previous checkpoint or the new one.
pub fn save(path: &Path, model: &Sequential, params: &[f32], meta: &CheckpointMeta) -> Result<()> {
    if params.len() != model.size() {
        return Err(MlErr::SizeMismatch {
            what: "checkpoint parameters",
            got: params.len(),
            expected: model.size(),
        }
        .into());
    }

    let shapes = model.named_shapes();
    let mut views = Vec::with_capacity(shapes.len());
    let mut rest = params;

    for (name, shape) in shapes {
        let (tensor, tail) = rest.split_at(shape.iter().product());
        rest = tail;

        let view = TensorView::new(Dtype::F32, shape, bytemuck::cast_slice(tensor))
            .map_err(|source| checkpoint_err(path, source))?;
        views.push((name, view));
    }

    let bytes = safetensors::serialize(views, &Some(meta.to_metadata()))
        .map_err(|source| checkpoint_err(path, source))?;

    let tmp = path.with_extension("safetensors.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads the parameters of `model` back from a checkpoint.
///
/// # Returns
/// The flat parameter buffer, or an error if a tensor is missing or has another shape or dtype.
pub fn load(path: &Path, model: &Sequential) -> Result<Vec<f32>> {
    let bytes = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes).map_err(|source| checkpoint_err(path, source))?;

    let mut params = Vec::with_capacity(model.size());
    for (name, shape) in model.named_shapes() {
        let view = tensors.tensor(&name).map_err(|_| SweepErr::CheckpointMismatch {
            path: path.to_path_buf(),
            tensor: name.clone(),
        })?;

        if view.dtype() != Dtype::F32 || view.shape() != shape.as_slice() {
            return Err(SweepErr::CheckpointMismatch {
                path: path.to_path_buf(),
                tensor: name,
            });
        }

        debug!("loaded {name} {:?}", view.shape());
        let values = view.data().chunks_exact(size_of::<f32>());
        params.extend(values.map(bytemuck::pod_read_unaligned::<f32>));
    }

    Ok(params)
}

/// Deletes the checkpoint at `path` if there is one.
///
/// # Returns
/// Whether a file was deleted.
pub fn remove_stale(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn checkpoint_err(path: &Path, source: safetensors::SafeTensorError) -> SweepErr {
    SweepErr::Checkpoint {
        path: path.to_path_buf(),
        source,
    }
}

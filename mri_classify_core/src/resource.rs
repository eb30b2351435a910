use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Instant,
};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::resnet;
use tracing::{debug, info};

use crate::{error::ClassifyError, infer::Classifier, label::NUM_CLASSES};

pub const WEIGHTS_FILE_NAME: &str = "resnet50_alzheimer_model.pth";
const EMBEDDED_WEIGHTS: &str = "model.safetensors";
const HEAD_WEIGHT: &str = "fc.weight";
const RESNET50_FEATURES: usize = 2048;

#[cfg(feature = "fat")]
use rust_embed::Embed;

#[cfg(feature = "fat")]
#[derive(Embed)]
#[folder = "resource/"]
struct Asset;

#[cfg(not(feature = "fat"))]
struct Asset;
#[cfg(not(feature = "fat"))]
struct FakeEmbedFile<'a> {
    data: &'a [u8],
}
#[cfg(not(feature = "fat"))]
impl Asset {
    fn get(_: &str) -> Option<FakeEmbedFile> {
        None
    }
}

/// Where the network parameters come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsSource {
    /// A `torch.save(state_dict)` archive, or a `.safetensors` file.
    File(PathBuf),
    /// `resource/model.safetensors`, compiled in with the `fat` feature.
    Embedded,
}

impl WeightsSource {
    /// An explicit path wins; otherwise the embedded weights when built with
    /// `fat`, otherwise the file next to the executable.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, ClassifyError> {
        if let Some(path) = explicit {
            return Ok(Self::File(path));
        }
        if cfg!(feature = "fat") {
            return Ok(Self::Embedded);
        }
        default_weights_path().map(Self::File)
    }
}

/// `resnet50_alzheimer_model.pth` in the directory holding the running binary.
pub fn default_weights_path() -> Result<PathBuf, ClassifyError> {
    let exe = std::env::current_exe()
        .map_err(|e| ClassifyError::ModelLoad(format!("cannot locate executable: {}", e)))?;
    let dir = exe.parent().ok_or_else(|| {
        ClassifyError::ModelLoad(format!("{} has no parent directory", exe.display()))
    })?;
    Ok(dir.join(WEIGHTS_FILE_NAME))
}

fn read_file(path: &Path) -> Result<HashMap<String, Tensor>, ClassifyError> {
    if !path.is_file() {
        return Err(ClassifyError::ModelLoad(format!(
            "weights file not found at {}",
            path.display()
        )));
    }
    let is_safetensors = path.extension().is_some_and(|ext| ext == "safetensors");
    let tensors = if is_safetensors {
        candle_core::safetensors::load(path, &Device::Cpu)
    } else {
        candle_core::pickle::read_all(path).map(|ts| ts.into_iter().collect())
    };
    tensors.map_err(|e| ClassifyError::ModelLoad(format!("read {} err:{}", path.display(), e)))
}

fn read_tensors(source: &WeightsSource) -> Result<HashMap<String, Tensor>, ClassifyError> {
    match source {
        WeightsSource::File(path) => read_file(path),
        WeightsSource::Embedded => {
            let f = Asset::get(EMBEDDED_WEIGHTS).ok_or(ClassifyError::ModelLoad(
                "no embedded weights, build with the `fat` feature".to_string(),
            ))?;
            candle_core::safetensors::load_buffer(&f.data[..], &Device::Cpu)
                .map_err(|e| ClassifyError::ModelLoad(format!("embedded weights: {}", e)))
        }
    }
}

/// Fails fast when the head does not have one row per class label.
fn check_head(tensors: &HashMap<String, Tensor>) -> Result<(), ClassifyError> {
    let head = tensors.get(HEAD_WEIGHT).ok_or(ClassifyError::ModelLoad(format!(
        "weights have no `{}` tensor",
        HEAD_WEIGHT
    )))?;
    let expected = [NUM_CLASSES, RESNET50_FEATURES];
    if head.dims() != expected.as_slice() {
        return Err(ClassifyError::ModelLoad(format!(
            "`{}` has shape {:?}, expected {:?}",
            HEAD_WEIGHT,
            head.dims(),
            expected
        )));
    }
    Ok(())
}

/// Builds ResNet-50 with a `NUM_CLASSES` head on the CPU. Batch norm runs on
/// its stored statistics, so the network is always in evaluation mode.
pub fn load_model(source: &WeightsSource) -> Result<Classifier, ClassifyError> {
    match source {
        WeightsSource::File(path) => info!("Looking for model at: {}", path.display()),
        WeightsSource::Embedded => info!("Using embedded model weights"),
    }
    let start = Instant::now();
    let tensors = read_tensors(source)?;
    debug!("read {} tensors", tensors.len());
    check_head(&tensors)?;

    let vb = VarBuilder::from_tensors(tensors, DType::F32, &Device::Cpu);
    let model = resnet::resnet50(NUM_CLASSES, vb).map_err(|e| {
        ClassifyError::ModelLoad(format!("weights do not fit ResNet-50: {}", e))
    })?;
    info!("model loaded in {:?}", start.elapsed());
    Ok(Classifier::new(model))
}

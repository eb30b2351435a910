pub mod config;
pub mod error;
pub mod infer;
pub mod input;
pub mod label;
pub mod preprocess;
pub mod resource;

#[cfg(test)]
mod fixtures;

pub use config::AppConfig;
pub use error::ClassifyError;
pub use infer::{Classifier, Prediction};
pub use input::Request;
pub use label::{Label, CLASS_LABELS, NUM_CLASSES};
pub use resource::WeightsSource;

use tracing::info;

/// Decodes the payload, loads the network and scores the image. The image is
/// checked before the weights are read.
pub fn classify(payload: &str, weights: &WeightsSource) -> Result<Prediction, ClassifyError> {
    info!("Processing image data...");
    let pixels = preprocess::load_payload(payload)?;

    let model = resource::load_model(weights)?;

    info!("Making prediction...");
    let start = std::time::Instant::now();
    let prediction = model.predict(&pixels)?;
    info!("forward costs:{:?}", start.elapsed());
    Ok(prediction)
}

/// Every way a single classification run can fail.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Invalid JSON input: {0}")]
    InvalidJson(String),
    #[error("No image data provided")]
    MissingImage,
    #[error("Failed to process image: {0}")]
    ImageDecode(String),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("model produced {actual} outputs, expected {expected}")]
    UnexpectedOutput { expected: usize, actual: usize },
    #[error(transparent)]
    Inference(#[from] candle_core::Error),
}

impl ClassifyError {
    /// True for errors caused by the request itself rather than by the image,
    /// the weights or the runtime.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidJson(_) | Self::MissingImage)
    }
}

use std::path::Path;

use base64::{engine::general_purpose, Engine};
use serde_json::{Map, Value};

use crate::error::ClassifyError;

/// Largest image file accepted by `Request::from_file`.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// A classification request: the image payload as a base64 string,
/// optionally carrying a data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub image: String,
}

impl Request {
    /// Parses `{"image": "..."}`. The request must be a JSON object; other
    /// fields are ignored.
    pub fn parse(arg: &str) -> Result<Self, ClassifyError> {
        let mut raw: Map<String, Value> =
            serde_json::from_str(arg).map_err(|e| ClassifyError::InvalidJson(e.to_string()))?;
        match raw.remove("image") {
            Some(Value::String(image)) if !image.is_empty() => Ok(Self { image }),
            None | Some(Value::Null) | Some(Value::String(_)) => Err(ClassifyError::MissingImage),
            Some(other) => Err(ClassifyError::InvalidJson(format!(
                "`image` must be a string, got {}",
                other
            ))),
        }
    }

    /// Builds a request from an image file on disk, at most `MAX_IMAGE_BYTES` long.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        let read_err = |e: std::io::Error| {
            ClassifyError::ImageDecode(format!("cannot read {}: {}", path.display(), e))
        };
        let len = std::fs::metadata(path).map_err(read_err)?.len();
        if len > MAX_IMAGE_BYTES {
            return Err(ClassifyError::ImageDecode(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                len,
                MAX_IMAGE_BYTES
            )));
        }
        let bytes = std::fs::read(path).map_err(read_err)?;
        if bytes.is_empty() {
            return Err(ClassifyError::MissingImage);
        }
        Ok(Self {
            image: general_purpose::STANDARD.encode(bytes),
        })
    }
}

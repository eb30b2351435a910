use std::io::Cursor;

use base64::{engine::general_purpose, Engine};
use candle_core::{DType, Device, Tensor};
use image::DynamicImage;

use crate::error::ClassifyError;

pub const IMAGE_SIZE: usize = 224;
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Drops a `data:<mime>;base64,` style prefix, keeping everything after the
/// first comma.
pub fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

pub fn decode_payload(payload: &str) -> Result<DynamicImage, ClassifyError> {
    let data: String = strip_data_url(payload)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ClassifyError::ImageDecode(format!("invalid base64: {}", e)))?;

    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?
        .decode()
        .map_err(|e| ClassifyError::ImageDecode(e.to_string()))?;
    Ok(img)
}

/// Resizes to 224x224 (aspect ratio not kept), normalizes each channel with
/// the ImageNet statistics and returns a `[1, 3, 224, 224]` tensor.
pub fn image_to_tensor(img: &DynamicImage) -> Result<Tensor, ClassifyError> {
    normalize(img).map_err(|e| ClassifyError::ImageDecode(e.to_string()))
}

fn normalize(img: &DynamicImage) -> candle_core::Result<Tensor> {
    let (height, width) = (IMAGE_SIZE, IMAGE_SIZE);
    let img = img.resize_exact(
        width as u32,
        height as u32,
        image::imageops::FilterType::Triangle,
    );

    let img = img.to_rgb8();

    let img = img.into_raw();
    let device = Device::Cpu;
    let mean = Tensor::new(&IMAGENET_MEAN, &device)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&IMAGENET_STD, &device)?.reshape((3, 1, 1))?;
    Tensor::from_vec(img, (height, width, 3), &device)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1. / 255., 0.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?
        .unsqueeze(0)
}

pub fn load_payload(payload: &str) -> Result<Tensor, ClassifyError> {
    let img = decode_payload(payload)?;
    tracing::debug!(
        "decoded {}x{} image ({:?})",
        img.width(),
        img.height(),
        img.color()
    );
    image_to_tensor(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::png_base64;
    use candle_core::IndexOp;

    #[test]
    fn strips_prefix_up_to_first_comma() {
        assert_eq!(strip_data_url("data:image/png;base64,abc,d"), "abc,d");
        assert_eq!(strip_data_url("abc"), "abc");
    }

    #[test]
    fn produces_batched_tensor() {
        let t = load_payload(&png_base64(40, 30, [10, 20, 30])).unwrap();
        assert_eq!(t.dims(), &[1, 3, IMAGE_SIZE, IMAGE_SIZE]);
        assert_eq!(t.dtype(), DType::F32);
    }

    #[test]
    fn data_url_prefix_does_not_change_tensor() {
        let raw = png_base64(64, 64, [200, 100, 50]);
        let prefixed = format!("data:image/png;base64,{}", raw);
        let a = load_payload(&raw).unwrap();
        let b = load_payload(&prefixed).unwrap();
        let diff = (a - b)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn solid_color_normalizes_per_channel() {
        let t = load_payload(&png_base64(17, 9, [255, 0, 0])).unwrap();
        let expected = [
            (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0],
            -IMAGENET_MEAN[1] / IMAGENET_STD[1],
            -IMAGENET_MEAN[2] / IMAGENET_STD[2],
        ];
        for (c, want) in expected.iter().enumerate() {
            let channel = t.i((0, c)).unwrap().flatten_all().unwrap();
            let min = channel.min(0).unwrap().to_scalar::<f32>().unwrap();
            let max = channel.max(0).unwrap().to_scalar::<f32>().unwrap();
            assert!((min - want).abs() < 1e-4, "channel {c}: {min} vs {want}");
            assert!((max - want).abs() < 1e-4, "channel {c}: {max} vs {want}");
        }
    }

    #[test]
    fn grayscale_input_is_expanded_to_rgb() {
        let gray = DynamicImage::new_luma8(10, 10);
        let t = image_to_tensor(&gray).unwrap();
        assert_eq!(t.dims(), &[1, 3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = load_payload("data:image/png;base64,@@not-base64@@").unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
        assert!(err.to_string().starts_with("Failed to process image:"));
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image() {
        let payload = general_purpose::STANDARD.encode(b"definitely not a png");
        let err = load_payload(&payload).unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
    }
}

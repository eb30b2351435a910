use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose, Engine};
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::resnet;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::label::NUM_CLASSES;

/// A solid-color PNG, base64-encoded without a data-URL prefix.
pub(crate) fn png_base64(width: u32, height: u32, rgb: [u8; 3]) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    general_purpose::STANDARD.encode(buf)
}

/// Writes a freshly initialized ResNet-50 with a `NUM_CLASSES` head to
/// `dir/resnet50.safetensors`.
pub(crate) fn resnet_weights(dir: &Path) -> PathBuf {
    let map = VarMap::new();
    let vb = VarBuilder::from_varmap(&map, DType::F32, &Device::Cpu);
    resnet::resnet50(NUM_CLASSES, vb).unwrap();
    let path = dir.join("resnet50.safetensors");
    map.save(&path).unwrap();
    path
}

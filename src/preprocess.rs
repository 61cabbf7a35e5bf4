use image::{imageops::FilterType, GenericImageView};
use ndarray::{Array, Ix4};
use std::io::Cursor;
use thiserror::Error;

pub const INPUT_SIZE: u32 = 224;

// Per-channel statistics the network was trained with.
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// Turns encoded image bytes into the normalized `[1, 3, 224, 224]` input
/// tensor the classifier expects. Bilinear resize, matching the transform
/// applied at training time.
pub fn transform(image_bytes: &[u8]) -> Result<Array<f32, Ix4>, PreprocessError> {
    let image_reader = image::ImageReader::new(Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    let img = image_reader
        .decode()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    let size = INPUT_SIZE as usize;
    let img = img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let mut input = Array::zeros((1, 3, size, size));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = ((r as f32) / 255. - CHANNEL_MEAN[0]) / CHANNEL_STD[0];
        input[[0, 1, y, x]] = ((g as f32) / 255. - CHANNEL_MEAN[1]) / CHANNEL_STD[1];
        input[[0, 2, y, x]] = ((b as f32) / 255. - CHANNEL_MEAN[2]) / CHANNEL_STD[2];
    }

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encode_png(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, color);
        let mut image_data: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut image_data);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        image_data
    }

    #[test]
    fn transform_produces_batched_input() {
        let image_data = encode_png(100, 80, Rgb([255, 0, 0]));

        let input = transform(&image_data).unwrap();

        assert_eq!(input.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn solid_color_normalizes_per_channel() {
        let image_data = encode_png(32, 32, Rgb([255, 255, 255]));

        let input = transform(&image_data).unwrap();

        for (channel, (mean, std)) in CHANNEL_MEAN.iter().zip(CHANNEL_STD.iter()).enumerate() {
            let expected = (1.0 - mean) / std;
            let got = input[[0, channel, 100, 100]];
            assert!(
                (got - expected).abs() < 1e-5,
                "channel {}: got {}, expected {}",
                channel,
                got,
                expected
            );
        }
    }

    #[test]
    fn same_bytes_yield_identical_tensors() {
        let image_data = encode_png(64, 48, Rgb([17, 120, 200]));

        let first = transform(&image_data).unwrap();
        let second = transform(&image_data).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let err = transform(b"definitely not an image").unwrap_err();

        assert!(matches!(err, PreprocessError::Decode(_)));
    }
}

//! Image preprocessing for landmark model inference.
//!
//! Turns encoded image bytes into the NHWC float tensor the model was
//! trained on: RGB, resized to the model input size, scaled to [0, 1],
//! with a leading batch dimension.

use crate::error::PredictError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tract_tflite::prelude::tract_ndarray::Array4;

/// Model input tensor, shaped `[1, height, width, 3]`
pub type InputTensor = Array4<f32>;

/// Number of color channels the model expects
pub const CHANNELS: usize = 3;

/// Converts encoded images into model input tensors.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
}

impl ImagePreprocessor {
    /// Create a preprocessor for a `width` x `height` model input.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Decode, resize and normalize in one step.
    pub fn prepare(&self, bytes: &[u8]) -> Result<InputTensor, PredictError> {
        let image = self.decode(bytes)?;
        Ok(self.to_tensor(&image))
    }

    /// Decode encoded bytes; the container format is guessed from content.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, PredictError> {
        if bytes.is_empty() {
            return Err(PredictError::MissingImage);
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Build the input tensor from an already decoded image of any mode.
    ///
    /// Non-RGB images (grayscale, RGBA, 16-bit) are converted first. The
    /// resize is exact, not aspect-preserving.
    pub fn to_tensor(&self, image: &DynamicImage) -> InputTensor {
        let rgb = image.to_rgb8();
        let resized: RgbImage = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::CatmullRom)
        };

        Array4::from_shape_fn(
            (1, self.height as usize, self.width as usize, CHANNELS),
            |(_, y, x, c)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        )
    }

    /// Shape of tensors produced by this preprocessor
    pub fn output_shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(224, 224)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage};
    use rand::Rng;
    use std::io::Cursor;

    /// Encode an image in the given container format.
    pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        encode(&DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    fn assert_valid_tensor(tensor: &InputTensor) {
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_rgb_image_of_arbitrary_size() {
        let preprocessor = ImagePreprocessor::default();
        let mut rng = rand::thread_rng();

        for _ in 0..5 {
            let (w, h) = (rng.gen_range(1..600), rng.gen_range(1..600));
            let tensor = preprocessor.prepare(&sample_png(w, h)).unwrap();
            assert_valid_tensor(&tensor);
        }
    }

    #[test]
    fn test_non_rgb_modes_are_converted() {
        let preprocessor = ImagePreprocessor::default();

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 80, Luma([200])));
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 120, Rgba([10, 20, 30, 0])));

        for image in [gray, rgba] {
            let bytes = encode(&image, ImageFormat::Png);
            assert_valid_tensor(&preprocessor.prepare(&bytes).unwrap());
        }
    }

    #[test]
    fn test_jpeg_input() {
        let img = RgbImage::from_pixel(640, 480, Rgb([255, 0, 128]));
        let bytes = encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
        let tensor = ImagePreprocessor::default().prepare(&bytes).unwrap();
        assert_valid_tensor(&tensor);
    }

    #[test]
    fn test_pixel_scaling() {
        let img = RgbImage::from_pixel(224, 224, Rgb([255, 0, 51]));
        let tensor = ImagePreprocessor::default().to_tensor(&DynamicImage::ImageRgb8(img));

        assert_eq!(tensor[[0, 10, 20, 0]], 1.0);
        assert_eq!(tensor[[0, 10, 20, 1]], 0.0);
        assert!((tensor[[0, 10, 20, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_layout_is_height_major() {
        // Left half white, right half black, no resize involved
        let img = RgbImage::from_fn(224, 224, |x, _| {
            if x < 112 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let tensor = ImagePreprocessor::default().to_tensor(&DynamicImage::ImageRgb8(img));

        assert_eq!(tensor[[0, 100, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 100, 223, 0]], 0.0);
    }

    #[test]
    fn test_custom_input_size() {
        let preprocessor = ImagePreprocessor::new(96, 64);
        let tensor = preprocessor.prepare(&sample_png(10, 10)).unwrap();
        assert_eq!(tensor.shape(), &preprocessor.output_shape());
        assert_eq!(tensor.shape(), &[1, 64, 96, 3]);
    }

    #[test]
    fn test_undecodable_bytes() {
        let preprocessor = ImagePreprocessor::default();
        assert!(matches!(
            preprocessor.prepare(b"definitely not an image"),
            Err(PredictError::Decode(_))
        ));
        assert!(matches!(preprocessor.prepare(&[]), Err(PredictError::MissingImage)));
    }
}

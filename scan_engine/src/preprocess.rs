use std::path::Path;

use image::{
    RgbImage,
    imageops::{self, FilterType},
};
use ml_core::ImageTensor;
use ndarray::Array4;

use crate::error::{Result, ScanErr};

/// Decodes and normalizes rasters into model input tensors.
pub struct ImagePreprocessor {
    size: u32,
}

impl ImagePreprocessor {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decodes the raster at `path` into a `[1, size, size, 3]` tensor with
    /// intensities scaled to `[0, 1]`.
    ///
    /// # Errors
    /// `ScanErr::ImageUnreadable` when the file cannot be decoded; no data
    /// is fabricated here, the boundary decides on fallbacks.
    pub fn preprocess(&self, path: &Path) -> Result<ImageTensor> {
        let img = image::open(path).map_err(|e| ScanErr::ImageUnreadable {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(self.tensor_from_rgb(&img.to_rgb8()))
    }

    /// Normalizes an already decoded raster.
    pub fn tensor_from_rgb(&self, rgb: &RgbImage) -> ImageTensor {
        let size = self.size;
        let resized = if rgb.dimensions() == (size, size) {
            rgb.clone()
        } else {
            imageops::resize(rgb, size, size, FilterType::Triangle)
        };

        let n = size as usize;
        let mut tensor = Array4::zeros((1, n, n, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for ch in 0..3 {
                tensor[[0, y as usize, x as usize, ch]] = pixel.0[ch] as f32 / 255.0;
            }
        }

        tensor
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(224)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_tensor_has_the_canonical_shape_and_range() {
        let mut rgb = RgbImage::new(50, 30);
        for (x, _, px) in rgb.enumerate_pixels_mut() {
            *px = Rgb([(x * 5) as u8, 128, 255]);
        }

        let pre = ImagePreprocessor::new(224);
        let tensor = pre.tensor_from_rgb(&rgb);

        assert_eq!(tensor.dim(), (1, 224, 224, 3));
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Blue channel is saturated everywhere in the source.
        assert!((tensor[[0, 10, 10, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_reported_unreadable() {
        let pre = ImagePreprocessor::default();
        let err = pre.preprocess(Path::new("/nope/missing.png")).unwrap_err();
        assert!(matches!(err, ScanErr::ImageUnreadable { .. }));
    }
}

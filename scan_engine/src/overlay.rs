use image::{
    ImageBuffer, Luma, RgbImage,
    imageops::{self, FilterType},
};
use ndarray::Array2;

use crate::gradcam::SaliencyMap;

/// Blends a color-mapped saliency map over the source raster.
pub struct OverlayRenderer {
    original_weight: f32,
    heatmap_weight: f32,
}

impl OverlayRenderer {
    pub fn new(original_weight: f32, heatmap_weight: f32) -> Self {
        Self {
            original_weight,
            heatmap_weight,
        }
    }

    /// Renders the composite: the saliency map is upsampled to the source
    /// dimensions, passed through the jet ramp and alpha-blended over the
    /// original. The output always matches the original's width/height.
    pub fn render(&self, original: &RgbImage, saliency: &SaliencyMap) -> RgbImage {
        let (width, height) = original.dimensions();
        let resized = resize_saliency(saliency, width, height);

        let mut out = RgbImage::new(width, height);
        for (x, y, px) in out.enumerate_pixels_mut() {
            let v = resized.get_pixel(x, y).0[0].clamp(0.0, 1.0);
            let heat = jet(v);
            let src = original.get_pixel(x, y).0;
            for ch in 0..3 {
                let blended =
                    self.original_weight * src[ch] as f32 + self.heatmap_weight * heat[ch] as f32;
                px.0[ch] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }

        out
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(0.6, 0.4)
    }
}

fn resize_saliency(saliency: &Array2<f32>, width: u32, height: u32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let (h, w) = saliency.dim();
    let buf = ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        Luma([saliency[[y as usize, x as usize]]])
    });

    if (w as u32, h as u32) == (width, height) {
        buf
    } else {
        imageops::resize(&buf, width, height, FilterType::Triangle)
    }
}

/// Fixed jet-style ramp from dark blue through green to red.
pub fn jet(v: f32) -> [u8; 3] {
    let v = v.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);

    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

use ndarray::Array2;
use rand::Rng;

use crate::gradcam::SaliencyMap;

/// Synthesizes a plausible focal heatmap when no gradient signal exists:
/// a radial field brightest at the image center, with per-pixel noise.
pub struct MockExplanationGenerator;

impl MockExplanationGenerator {
    /// Builds a `height` x `width` saliency map in `[0, 1]`. Never fails;
    /// degenerate sizes collapse to a single-cell map.
    pub fn saliency<R: Rng>(width: u32, height: u32, rng: &mut R) -> SaliencyMap {
        let (w, h) = (width.max(1) as usize, height.max(1) as usize);
        let (cx, cy) = ((w / 2) as f32, (h / 2) as f32);

        let mut map = Array2::zeros((h, w));
        let mut max = 0.0f32;
        for y in 0..h {
            for x in 0..w {
                let d = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                map[[y, x]] = d;
                max = max.max(d);
            }
        }

        if max > 0.0 {
            map.mapv_inplace(|d| d / max);
        }
        for v in map.iter_mut() {
            *v = (1.0 - *v + rng.random_range(0.0..0.3)).clamp(0.0, 1.0);
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_mock_map_is_center_weighted_and_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let map = MockExplanationGenerator::saliency(64, 48, &mut rng);

        assert_eq!(map.dim(), (48, 64));
        assert!(map.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // The center saturates at 1; corners keep at most the noise level.
        assert_eq!(map[[24, 32]], 1.0);
        assert!(map[[0, 0]] < 0.5);
    }

    #[test]
    fn test_same_seed_reproduces_the_same_map() {
        let a = MockExplanationGenerator::saliency(32, 32, &mut StdRng::seed_from_u64(11));
        let b = MockExplanationGenerator::saliency(32, 32, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_cell_maps_do_not_divide_by_zero() {
        let mut rng = StdRng::seed_from_u64(5);
        let map = MockExplanationGenerator::saliency(1, 1, &mut rng);
        assert_eq!(map.dim(), (1, 1));
        assert!((0.0..=1.0).contains(&map[[0, 0]]));
    }
}

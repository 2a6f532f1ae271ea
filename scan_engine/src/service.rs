//! The service boundary: exactly two operations, `classify` and `explain`,
//! both best-effort and infallible outward. Collaborators (upload routing,
//! persistence, display) consume file paths and structured results; every
//! internal failure degrades to a weaker tier instead of propagating.

use std::{
    path::Path,
    sync::{Mutex, PoisonError},
};

use image::RgbImage;
use log::{error, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::{
    config::ScanConfig,
    gradcam::ExplanationEngine,
    mock::MockExplanationGenerator,
    overlay::OverlayRenderer,
    predict::Predictor,
    preprocess::ImagePreprocessor,
    repository::ModelRepository,
};

/// Raster size used when the source image cannot be decoded at all.
const PLACEHOLDER_SIZE: u32 = 224;

/// The structured classification result handed to collaborators.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub label: String,
    /// Confidence as a percentage, rounded to two decimals.
    pub confidence_percent: f32,
}

pub struct ScanService<R: Rng> {
    preprocessor: ImagePreprocessor,
    predictor: Predictor,
    engine: ExplanationEngine,
    renderer: OverlayRenderer,
    rng: Mutex<R>,
}

impl ScanService<StdRng> {
    /// Builds a service from config with an OS-seeded random source,
    /// acquiring the model through the repository's fallback chain.
    pub fn with_default_rng(config: &ScanConfig) -> Self {
        let mut rng = StdRng::from_os_rng();
        let repository = ModelRepository::acquire(&config.model_path, &mut rng);
        Self::new(config, &repository, rng)
    }
}

impl<R: Rng> ScanService<R> {
    /// Creates a new `ScanService`.
    ///
    /// # Arguments
    /// * `config` - Input size, artifact path and blend weights.
    /// * `repository` - The acquired model; held read-only for the process
    ///   lifetime.
    /// * `rng` - Random source for every stochastic fallback, injected
    ///   explicitly so tests can seed it.
    pub fn new(config: &ScanConfig, repository: &ModelRepository, rng: R) -> Self {
        info!("scan service ready (model tier: {})", repository.tier());

        Self {
            preprocessor: ImagePreprocessor::new(config.input_size),
            predictor: Predictor::new(repository.model(), repository.is_degraded()),
            engine: ExplanationEngine::new(repository.model()),
            renderer: OverlayRenderer::new(config.original_weight, config.heatmap_weight),
            rng: Mutex::new(rng),
        }
    }

    /// Classifies the image at `path`. Never fails: unreadable sources get
    /// the bounded random fallback.
    pub fn classify(&self, path: &Path) -> ScanReport {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match self.preprocessor.preprocess(path) {
            Ok(tensor) => self.predictor.classify(&tensor, &mut *rng),
            Err(e) => {
                warn!("{e}; falling back to a random prediction");
                self.predictor.classify_unreadable(&mut *rng)
            }
        };

        ScanReport {
            label: result.label.to_string(),
            confidence_percent: (result.confidence * 10_000.0).round() / 100.0,
        }
    }

    /// Writes a heatmap overlay for the image at `path` to `output`.
    /// Returns `false` (never panics) only when the overlay cannot be
    /// written at all.
    pub fn explain(&self, path: &Path, output: &Path) -> bool {
        self.explain_with_target(path, output, None)
    }

    /// `explain` with an explicit target class instead of the arg-max.
    pub fn explain_with_target(
        &self,
        path: &Path,
        output: &Path,
        target_class: Option<usize>,
    ) -> bool {
        let base = match image::open(path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                warn!(
                    "cannot decode {} ({e}); using a placeholder raster",
                    path.display()
                );
                None
            }
        };
        let readable = base.is_some();
        let base = base.unwrap_or_else(|| RgbImage::new(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        let (width, height) = base.dimensions();

        let saliency = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            if readable {
                let tensor = self.preprocessor.tensor_from_rgb(&base);
                match self.engine.explain(&tensor, target_class) {
                    Ok(map) => map,
                    Err(e) => {
                        warn!("{e}; substituting a mock heatmap");
                        MockExplanationGenerator::saliency(width, height, &mut *rng)
                    }
                }
            } else {
                MockExplanationGenerator::saliency(width, height, &mut *rng)
            }
        };

        let overlay = self.renderer.render(&base, &saliency);
        match overlay.save(output) {
            Ok(()) => true,
            Err(e) => {
                error!("failed to write overlay {} ({e})", output.display());
                false
            }
        }
    }
}

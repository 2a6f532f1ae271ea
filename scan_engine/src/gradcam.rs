//! Gradient-weighted class activation mapping.
//!
//! The engine picks a localization target once per model from the layer
//! catalog, then per request weighs the target activation's channels by
//! the spatially averaged gradient of the chosen class score.

use std::sync::Arc;

use log::{debug, warn};
use ml_core::{ClassificationModel, ImageTensor, LayerInfo, LayerRole};
use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, ScanErr};

/// A per-location importance map with values in `[0, 1]`.
pub type SaliencyMap = Array2<f32>;

pub struct ExplanationEngine {
    model: Arc<dyn ClassificationModel>,
    target: Option<usize>,
}

impl ExplanationEngine {
    /// Creates a new `ExplanationEngine`, choosing and memoizing the
    /// localization target for the model's lifetime.
    pub fn new(model: Arc<dyn ClassificationModel>) -> Self {
        let target = select_target(&model.catalog());
        match target {
            Some(i) => debug!("localization target is layer index {i}"),
            None => warn!("model exposes no spatial layer, explanations will degrade to mock"),
        }

        Self { model, target }
    }

    /// The memoized target layer index, if the model has one.
    pub fn target_layer(&self) -> Option<usize> {
        self.target
    }

    /// Computes a saliency map for `tensor`.
    ///
    /// # Arguments
    /// * `tensor` - The preprocessed input.
    /// * `target_class` - Output index to localize; the arg-max of the
    ///   output vector when absent.
    ///
    /// # Errors
    /// `ScanErr::ExplanationUnavailable` whenever no real gradient map can
    /// be produced; callers substitute the mock generator.
    pub fn explain(
        &self,
        tensor: &ImageTensor,
        target_class: Option<usize>,
    ) -> Result<SaliencyMap> {
        let target = self.target.ok_or_else(|| ScanErr::ExplanationUnavailable {
            reason: "model exposes no spatial layer".into(),
        })?;

        let trace = self.model.traced_forward(tensor)?;
        let class = match target_class {
            Some(c) => c,
            None => argmax(trace.output()),
        };

        let grads = self.model.activation_gradient(&trace, target, class)?;
        let acts = trace
            .spatial(target)
            .ok_or_else(|| ScanErr::ExplanationUnavailable {
                reason: "target layer activation is not spatial".into(),
            })?;
        if grads.dim() != acts.dim() {
            return Err(ScanErr::ExplanationUnavailable {
                reason: "gradient and activation shapes disagree".into(),
            });
        }

        // Channel weights are the spatial mean of the gradient; the map is
        // the weighted channel sum, rectified and max-normalized.
        let (h, w, c) = grads.dim();
        let hw = (h * w) as f32;
        let mut heat = Array2::<f32>::zeros((h, w));
        for ch in 0..c {
            let weight = grads.index_axis(Axis(2), ch).sum() / hw;
            heat.zip_mut_with(&acts.index_axis(Axis(2), ch), |h, &a| *h += weight * a);
        }

        heat.mapv_inplace(|v| v.max(0.0));
        let max = heat.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            heat.mapv_inplace(|v| v / max);
        }

        Ok(heat)
    }
}

/// Target policy: the last convolution-roled layer, otherwise the last
/// layer whose output still has spatial axes, otherwise nothing.
pub fn select_target(catalog: &[LayerInfo]) -> Option<usize> {
    if let Some(i) = catalog
        .iter()
        .rposition(|l| l.role == LayerRole::Convolution)
    {
        return Some(i);
    }

    catalog.iter().rposition(|l| l.output_rank > 2)
}

fn argmax(y: &Array1<f32>) -> usize {
    let mut idx = 0;
    let mut best = f32::NEG_INFINITY;
    for (i, &v) in y.iter().enumerate() {
        if v > best {
            best = v;
            idx = i;
        }
    }

    idx
}

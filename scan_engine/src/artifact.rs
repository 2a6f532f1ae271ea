//! Persisted model artifacts.
//!
//! A model is stored as a JSON document describing its input shape, its
//! layer stack with flat weight vectors, and optionally the training
//! configuration it was produced with. Reconstruction validates the shape
//! arithmetic layer by layer so a corrupt artifact fails loudly here and
//! the repository can move on to the next acquisition tier.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use ml_core::{ActFn, SequentialNet, arch::layers::Layer};
use serde::{Deserialize, Serialize};

/// Optimizer definitions the loader knows how to reconstruct.
const KNOWN_OPTIMIZERS: &[&str] = &["adam", "sgd", "rmsprop"];

/// Loss definitions the loader knows how to reconstruct.
const KNOWN_LOSSES: &[&str] = &["binary_crossentropy", "categorical_crossentropy", "mse"];

/// A persisted classification model.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Expected input shape `(height, width, channels)`, batch excluded.
    pub input: [usize; 3],
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub training: Option<TrainingConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2 {
        name: String,
        kernel: [usize; 2],
        filters: usize,
        activation: String,
        weights: Vec<f32>,
        bias: Vec<f32>,
    },
    MaxPool2 {
        name: String,
        pool: usize,
    },
    GlobalAvgPool {
        name: String,
    },
    Flatten {
        name: String,
    },
    Dense {
        name: String,
        units: usize,
        activation: String,
        weights: Vec<f32>,
        bias: Vec<f32>,
    },
}

/// The configuration a model was trained with. Only needed to fully
/// reconstruct the artifact; inference-only loads ignore it.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub optimizer: String,
    pub loss: String,
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading model artifact {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing model artifact {}", path.display()))
    }

    /// Checks that the training section references only known optimizer and
    /// loss definitions.
    ///
    /// # Errors
    /// Fails on any name outside the registry; the caller is expected to
    /// retry as an inference-only load.
    pub fn resolve_training(&self) -> Result<()> {
        let Some(cfg) = &self.training else {
            return Ok(());
        };

        if !KNOWN_OPTIMIZERS.contains(&cfg.optimizer.as_str()) {
            bail!("unknown optimizer definition {:?}", cfg.optimizer);
        }
        if !KNOWN_LOSSES.contains(&cfg.loss.as_str()) {
            bail!("unknown loss definition {:?}", cfg.loss);
        }

        Ok(())
    }

    /// Reconstructs the network, validating shape arithmetic layer by layer.
    pub fn build(&self) -> Result<SequentialNet> {
        let [h, w, c] = self.input;
        if h == 0 || w == 0 || c == 0 {
            bail!("artifact declares an empty input shape {:?}", self.input);
        }
        if self.layers.is_empty() {
            bail!("artifact declares no layers");
        }

        // Shape state while walking the stack: spatial until the network
        // goes flat, flat afterwards.
        let mut spatial = Some((h, w, c));
        let mut flat: Option<usize> = None;
        let mut layers = Vec::with_capacity(self.layers.len());

        for spec in &self.layers {
            match spec {
                LayerSpec::Conv2 {
                    name,
                    kernel,
                    filters,
                    activation,
                    weights,
                    bias,
                } => {
                    let Some((h, w, c)) = spatial else {
                        bail!("convolution {name:?} appears after the network went flat");
                    };
                    if h < kernel[0] || w < kernel[1] {
                        bail!("convolution {name:?} kernel exceeds its {h}x{w} input");
                    }
                    let relu = match activation.as_str() {
                        "relu" => true,
                        "linear" => false,
                        other => bail!("unsupported convolution activation {other:?} in {name:?}"),
                    };

                    let layer = Layer::conv2(
                        name,
                        (kernel[0], kernel[1]),
                        c,
                        *filters,
                        weights.clone(),
                        bias.clone(),
                        relu,
                    )
                    .with_context(|| format!("layer {name:?}"))?;

                    spatial = Some((h - kernel[0] + 1, w - kernel[1] + 1, *filters));
                    layers.push(layer);
                }
                LayerSpec::MaxPool2 { name, pool } => {
                    let Some((h, w, c)) = spatial else {
                        bail!("pooling {name:?} appears after the network went flat");
                    };
                    let layer = Layer::max_pool2(name, *pool)
                        .with_context(|| format!("layer {name:?}"))?;
                    if h / pool == 0 || w / pool == 0 {
                        bail!("pooling {name:?} collapses its {h}x{w} input to nothing");
                    }

                    spatial = Some((h / pool, w / pool, c));
                    layers.push(layer);
                }
                LayerSpec::GlobalAvgPool { name } => {
                    let Some((_, _, c)) = spatial else {
                        bail!("global pooling {name:?} appears after the network went flat");
                    };

                    spatial = None;
                    flat = Some(c);
                    layers.push(Layer::global_avg_pool(name));
                }
                LayerSpec::Flatten { name } => {
                    let Some((h, w, c)) = spatial else {
                        bail!("flatten {name:?} appears after the network went flat");
                    };

                    spatial = None;
                    flat = Some(h * w * c);
                    layers.push(Layer::flatten(name));
                }
                LayerSpec::Dense {
                    name,
                    units,
                    activation,
                    weights,
                    bias,
                } => {
                    let Some(inputs) = flat else {
                        bail!("dense {name:?} appears before the network went flat");
                    };
                    let act = ActFn::parse(activation).ok_or_else(|| {
                        anyhow!("unsupported dense activation {activation:?} in {name:?}")
                    })?;

                    let layer =
                        Layer::dense(name, (inputs, *units), weights.clone(), bias.clone(), act)
                            .with_context(|| format!("layer {name:?}"))?;

                    flat = Some(*units);
                    layers.push(layer);
                }
            }
        }

        if flat.is_none() {
            bail!("artifact does not end in a flat output head");
        }

        Ok(SequentialNet::new(layers))
    }
}

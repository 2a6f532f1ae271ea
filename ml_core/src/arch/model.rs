use std::fmt::{self, Display};

use ndarray::{Array1, Array3, Array4};

use crate::Result;

/// A preprocessed input raster: `[batch = 1, height, width, channel]`,
/// canonical RGB, intensities scaled to `[0, 1]`.
pub type ImageTensor = Array4<f32>;

/// The role a layer plays in a network.
///
/// Explanation tooling queries roles to pick a localization target instead
/// of string-matching layer names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerRole {
    Convolution,
    Pooling,
    GlobalPooling,
    Flatten,
    Dense,
}

impl Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayerRole::Convolution => "convolution",
            LayerRole::Pooling => "pooling",
            LayerRole::GlobalPooling => "global-pooling",
            LayerRole::Flatten => "flatten",
            LayerRole::Dense => "dense",
        };

        write!(f, "{s}")
    }
}

/// Catalog entry describing one layer of a model.
#[derive(Clone, Debug)]
pub struct LayerInfo {
    pub name: String,
    pub role: LayerRole,
    /// Rank of the layer's output including the batch axis: 4 for spatial
    /// maps, 2 for flat vectors.
    pub output_rank: usize,
    /// Number of trainable scalars the layer holds.
    pub params: usize,
}

/// An intermediate activation flowing between layers.
#[derive(Clone, Debug)]
pub enum Value {
    /// A spatial map `(height, width, channels)`.
    Spatial(Array3<f32>),
    /// A flat feature vector.
    Flat(Array1<f32>),
}

impl Value {
    /// Rank of this value including the implicit batch axis.
    pub fn rank(&self) -> usize {
        match self {
            Value::Spatial(_) => 4,
            Value::Flat(_) => 2,
        }
    }

    pub fn as_spatial(&self) -> Option<&Array3<f32>> {
        match self {
            Value::Spatial(a) => Some(a),
            Value::Flat(_) => None,
        }
    }

    pub fn as_flat(&self) -> Option<&Array1<f32>> {
        match self {
            Value::Flat(a) => Some(a),
            Value::Spatial(_) => None,
        }
    }
}

/// Per-layer activations captured during a single forward pass.
///
/// `activation(i)` is the output of layer `i`; the final output vector is
/// also available directly through `output`.
#[derive(Debug)]
pub struct Trace {
    activations: Vec<Value>,
    output: Array1<f32>,
}

impl Trace {
    pub(crate) fn new(activations: Vec<Value>, output: Array1<f32>) -> Self {
        Self {
            activations,
            output,
        }
    }

    /// The network's final output vector.
    pub fn output(&self) -> &Array1<f32> {
        &self.output
    }

    /// The captured activation of layer `layer`, if it exists.
    pub fn activation(&self, layer: usize) -> Option<&Value> {
        self.activations.get(layer)
    }

    /// The captured activation of layer `layer` as a spatial map.
    pub fn spatial(&self, layer: usize) -> Option<&Array3<f32>> {
        self.activations.get(layer).and_then(Value::as_spatial)
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }
}

/// A classification model: forward inference plus enough introspection for
/// gradient-based localization.
///
/// All methods take `&self` over immutable weights, so a single instance is
/// safely shared read-only across concurrent callers for the process
/// lifetime; no caller may mutate weights or configuration.
pub trait ClassificationModel: Send + Sync {
    /// Describes every layer in definition order.
    fn catalog(&self) -> Vec<LayerInfo>;

    /// Total number of trainable scalars.
    fn num_params(&self) -> usize;

    /// Runs a plain forward pass and returns the output vector.
    fn predict(&self, input: &ImageTensor) -> Result<Array1<f32>>;

    /// Runs a forward pass capturing every layer's activation.
    fn traced_forward(&self, input: &ImageTensor) -> Result<Trace>;

    /// Computes the gradient of the output scalar `output[class]` with
    /// respect to the activation of layer `layer`, using the captured
    /// forward trace.
    ///
    /// # Errors
    /// Fails when indices are out of bounds, when the gradient would have
    /// to flow through a layer that does not support it, or when the target
    /// activation is not spatial.
    fn activation_gradient(
        &self,
        trace: &Trace,
        layer: usize,
        class: usize,
    ) -> Result<Array3<f32>>;
}

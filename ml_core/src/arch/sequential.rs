use ndarray::{Array1, Array3, Axis};

use super::{ClassificationModel, ImageTensor, LayerInfo, Trace, Value, layers::Layer};
use crate::{MlErr, Result};

/// A feed-forward stack of layers.
///
/// Inference is pure: every pass borrows the network and its weights
/// read-only, so one instance can serve concurrent callers without
/// synchronization. Traced passes keep a tape of per-layer activations for
/// later gradient walks.
pub struct SequentialNet {
    layers: Vec<Layer>,
}

impl SequentialNet {
    /// Creates a new `SequentialNet`.
    ///
    /// # Arguments
    /// * `layers` - The layers the network is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Strips the batch axis, enforcing the batch-of-one invariant.
    fn input_value(input: &ImageTensor) -> Result<Value> {
        let batch = input.len_of(Axis(0));
        if batch != 1 {
            return Err(MlErr::BadBatch { got: batch });
        }

        Ok(Value::Spatial(input.index_axis(Axis(0), 0).to_owned()))
    }
}

impl ClassificationModel for SequentialNet {
    fn catalog(&self) -> Vec<LayerInfo> {
        self.layers.iter().map(Layer::describe).collect()
    }

    fn num_params(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn predict(&self, input: &ImageTensor) -> Result<Array1<f32>> {
        if self.layers.is_empty() {
            return Err(MlErr::EmptyNetwork);
        }

        let mut v = Self::input_value(input)?;
        for layer in &self.layers {
            v = layer.forward(&v)?;
        }

        match v {
            Value::Flat(y) => Ok(y),
            Value::Spatial(_) => Err(MlErr::FlatOutputExpected),
        }
    }

    fn traced_forward(&self, input: &ImageTensor) -> Result<Trace> {
        if self.layers.is_empty() {
            return Err(MlErr::EmptyNetwork);
        }

        let v0 = Self::input_value(input)?;
        let mut activations: Vec<Value> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let x = activations.last().unwrap_or(&v0);
            let y = layer.forward(x)?;
            activations.push(y);
        }

        let output = match activations.last() {
            Some(Value::Flat(y)) => y.clone(),
            _ => return Err(MlErr::FlatOutputExpected),
        };

        Ok(Trace::new(activations, output))
    }

    fn activation_gradient(
        &self,
        trace: &Trace,
        layer: usize,
        class: usize,
    ) -> Result<Array3<f32>> {
        let nlayers = self.layers.len();
        if trace.len() != nlayers {
            return Err(MlErr::ShapeMismatch {
                what: "trace length",
                got: trace.len(),
                expected: nlayers,
            });
        }
        if layer >= nlayers {
            return Err(MlErr::LayerOutOfBounds {
                got: layer,
                len: nlayers,
            });
        }

        let y = trace.output();
        if class >= y.len() {
            return Err(MlErr::ClassOutOfBounds {
                got: class,
                len: y.len(),
            });
        }

        // Seed with d(output[class]) / d(output) and walk the tape back to
        // the layer just above the target.
        let mut seed = Array1::zeros(y.len());
        seed[class] = 1.0;
        let mut d = Value::Flat(seed);

        for i in ((layer + 1)..nlayers).rev() {
            let x = trace.activation(i - 1).ok_or(MlErr::LayerOutOfBounds {
                got: i - 1,
                len: nlayers,
            })?;
            let yv = trace.activation(i).ok_or(MlErr::LayerOutOfBounds {
                got: i,
                len: nlayers,
            })?;
            d = self.layers[i].backward(x, yv, &d)?;
        }

        match d {
            Value::Spatial(g) => Ok(g),
            Value::Flat(_) => Err(MlErr::RankMismatch {
                layer: self.layers[layer].name().to_string(),
                expected: "spatial activation",
            }),
        }
    }
}

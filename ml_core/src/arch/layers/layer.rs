use ndarray::{Array1, Array3};

use super::{Conv2, Dense, GlobalAvgPool, MaxPool2};
use crate::{
    MlErr, Result,
    arch::{ActFn, LayerInfo, LayerRole, Value},
};

/// Reshapes a spatial map into a flat feature vector (row-major).
#[derive(Clone, Debug)]
pub struct Flatten {
    name: String,
}

impl Flatten {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&self, x: &Array3<f32>) -> Array1<f32> {
        Array1::from_iter(x.iter().copied())
    }

    pub fn backward(&self, x: &Array3<f32>, d: &Array1<f32>) -> Result<Array3<f32>> {
        let dim = x.dim();
        if d.len() != dim.0 * dim.1 * dim.2 {
            return Err(MlErr::ShapeMismatch {
                what: "flatten gradient",
                got: d.len(),
                expected: dim.0 * dim.1 * dim.2,
            });
        }

        Array3::from_shape_vec(dim, d.to_vec()).map_err(|_| MlErr::ShapeMismatch {
            what: "flatten gradient layout",
            got: d.len(),
            expected: dim.0 * dim.1 * dim.2,
        })
    }
}

#[derive(Debug)]
pub enum Layer {
    Conv2(Conv2),
    MaxPool2(MaxPool2),
    GlobalAvgPool(GlobalAvgPool),
    Flatten(Flatten),
    Dense(Dense),
}
use Layer::*;

impl Layer {
    pub fn conv2(
        name: impl Into<String>,
        kernel: (usize, usize),
        in_ch: usize,
        out_ch: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
        relu: bool,
    ) -> Result<Self> {
        Ok(Self::Conv2(Conv2::new(
            name, kernel, in_ch, out_ch, weights, bias, relu,
        )?))
    }

    pub fn max_pool2(name: impl Into<String>, pool: usize) -> Result<Self> {
        Ok(Self::MaxPool2(MaxPool2::new(name, pool)?))
    }

    pub fn global_avg_pool(name: impl Into<String>) -> Self {
        Self::GlobalAvgPool(GlobalAvgPool::new(name))
    }

    pub fn flatten(name: impl Into<String>) -> Self {
        Self::Flatten(Flatten::new(name))
    }

    pub fn dense(
        name: impl Into<String>,
        dim: (usize, usize),
        weights: Vec<f32>,
        bias: Vec<f32>,
        act: ActFn,
    ) -> Result<Self> {
        Ok(Self::Dense(Dense::new(name, dim, weights, bias, act)?))
    }

    pub fn name(&self) -> &str {
        match self {
            Conv2(l) => l.name(),
            MaxPool2(l) => l.name(),
            GlobalAvgPool(l) => l.name(),
            Flatten(l) => l.name(),
            Dense(l) => l.name(),
        }
    }

    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Conv2(l) => l.size(),
            Dense(l) => l.size(),
            MaxPool2(_) | GlobalAvgPool(_) | Flatten(_) => 0,
        }
    }

    pub fn describe(&self) -> LayerInfo {
        let (role, output_rank) = match self {
            Conv2(_) => (LayerRole::Convolution, 4),
            MaxPool2(_) => (LayerRole::Pooling, 4),
            GlobalAvgPool(_) => (LayerRole::GlobalPooling, 2),
            Flatten(_) => (LayerRole::Flatten, 2),
            Dense(_) => (LayerRole::Dense, 2),
        };

        LayerInfo {
            name: self.name().to_string(),
            role,
            output_rank,
            params: self.size(),
        }
    }

    pub fn forward(&self, x: &Value) -> Result<Value> {
        match (self, x) {
            (Conv2(l), Value::Spatial(x)) => Ok(Value::Spatial(l.forward(x)?)),
            (MaxPool2(l), Value::Spatial(x)) => Ok(Value::Spatial(l.forward(x)?)),
            (GlobalAvgPool(l), Value::Spatial(x)) => Ok(Value::Flat(l.forward(x))),
            (Flatten(l), Value::Spatial(x)) => Ok(Value::Flat(l.forward(x))),
            (Dense(l), Value::Flat(x)) => Ok(Value::Flat(l.forward(x)?)),
            _ => Err(self.rank_mismatch()),
        }
    }

    /// Gradient with respect to this layer's input.
    ///
    /// # Arguments
    /// * `x` - The layer's input captured during the forward pass.
    /// * `y` - The layer's output captured during the forward pass.
    /// * `d` - The gradient with respect to `y`.
    pub fn backward(&self, x: &Value, y: &Value, d: &Value) -> Result<Value> {
        match self {
            Conv2(l) => Err(MlErr::GradientUnsupported {
                layer: l.name().to_string(),
            }),
            MaxPool2(l) => {
                let x = x.as_spatial().ok_or_else(|| self.rank_mismatch())?;
                let d = d.as_spatial().ok_or_else(|| self.rank_mismatch())?;
                Ok(Value::Spatial(l.backward(x, d)?))
            }
            GlobalAvgPool(l) => {
                let x = x.as_spatial().ok_or_else(|| self.rank_mismatch())?;
                let d = d.as_flat().ok_or_else(|| self.rank_mismatch())?;
                Ok(Value::Spatial(l.backward(x.dim(), d)?))
            }
            Flatten(l) => {
                let x = x.as_spatial().ok_or_else(|| self.rank_mismatch())?;
                let d = d.as_flat().ok_or_else(|| self.rank_mismatch())?;
                Ok(Value::Spatial(l.backward(x, d)?))
            }
            Dense(l) => {
                let a = y.as_flat().ok_or_else(|| self.rank_mismatch())?;
                let d = d.as_flat().ok_or_else(|| self.rank_mismatch())?;
                Ok(Value::Flat(l.backward(a, d)?))
            }
        }
    }

    fn rank_mismatch(&self) -> MlErr {
        let expected = match self {
            Conv2(_) | MaxPool2(_) | GlobalAvgPool(_) | Flatten(_) => "spatial map",
            Dense(_) => "flat vector",
        };

        MlErr::RankMismatch {
            layer: self.name().to_string(),
            expected,
        }
    }
}

use ndarray::{Array1, Array2};

use crate::{MlErr, Result, arch::ActFn};

/// A fully connected layer with an activation.
#[derive(Clone, Debug)]
pub struct Dense {
    name: String,
    dim: (usize, usize),
    weights: Array2<f32>,
    bias: Array1<f32>,
    act: ActFn,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `name` - The layer's catalog name.
    /// * `dim` - `(inputs, outputs)`.
    /// * `weights` - Flat weight matrix, `(inputs, outputs)` row-major.
    /// * `bias` - One bias per output.
    /// * `act` - The activation applied to the pre-activation vector.
    pub fn new(
        name: impl Into<String>,
        dim: (usize, usize),
        weights: Vec<f32>,
        bias: Vec<f32>,
        act: ActFn,
    ) -> Result<Self> {
        if dim.0 == 0 || dim.1 == 0 {
            return Err(MlErr::ShapeMismatch {
                what: "dense dimensions",
                got: dim.0 * dim.1,
                expected: 1,
            });
        }
        if weights.len() != dim.0 * dim.1 {
            return Err(MlErr::ShapeMismatch {
                what: "dense weights",
                got: weights.len(),
                expected: dim.0 * dim.1,
            });
        }
        if bias.len() != dim.1 {
            return Err(MlErr::ShapeMismatch {
                what: "dense bias",
                got: bias.len(),
                expected: dim.1,
            });
        }

        let weights = Array2::from_shape_vec(dim, weights).map_err(|_| MlErr::ShapeMismatch {
            what: "dense weight layout",
            got: dim.0 * dim.1,
            expected: dim.0 * dim.1,
        })?;

        Ok(Self {
            name: name.into(),
            dim,
            weights,
            bias: Array1::from_vec(bias),
            act,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    pub fn forward(&self, x: &Array1<f32>) -> Result<Array1<f32>> {
        if x.len() != self.dim.0 {
            return Err(MlErr::ShapeMismatch {
                what: "dense input",
                got: x.len(),
                expected: self.dim.0,
            });
        }

        let z = x.dot(&self.weights) + &self.bias;
        Ok(self.act.apply(z))
    }

    /// Gradient with respect to the input, given the layer output `a` and
    /// the gradient `d` with respect to it.
    pub fn backward(&self, a: &Array1<f32>, d: &Array1<f32>) -> Result<Array1<f32>> {
        if a.len() != self.dim.1 || d.len() != self.dim.1 {
            return Err(MlErr::ShapeMismatch {
                what: "dense gradient",
                got: a.len().max(d.len()),
                expected: self.dim.1,
            });
        }

        let dz = self.act.grad(a, d);
        Ok(self.weights.dot(&dz))
    }
}

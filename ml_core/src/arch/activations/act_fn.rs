use ndarray::{Array1, Zip};

/// Activation applied to a dense layer's pre-activation vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActFn {
    Linear,
    Relu,
    Sigmoid,
    Softmax,
}
use ActFn::*;

impl ActFn {
    /// Resolves an activation by its artifact name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Linear),
            "relu" => Some(Relu),
            "sigmoid" => Some(Sigmoid),
            "softmax" => Some(Softmax),
            _ => None,
        }
    }

    pub fn apply(&self, z: Array1<f32>) -> Array1<f32> {
        match self {
            Linear => z,
            Relu => z.mapv_into(|z| z.max(0.)),
            Sigmoid => z.mapv_into(|z| 1. / (1. + (-z).exp())),
            Softmax => {
                // Shift by the max for numerical stability.
                let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut a = z.mapv_into(|z| (z - max).exp());
                let sum = a.sum();
                a.mapv_inplace(|e| e / sum);
                a
            }
        }
    }

    /// Gradient through the activation, expressed over post-activation
    /// values: given the layer output `a` and the gradient `d` with respect
    /// to it, returns the gradient with respect to the pre-activation.
    pub fn grad(&self, a: &Array1<f32>, d: &Array1<f32>) -> Array1<f32> {
        match self {
            Linear => d.clone(),
            Relu => Zip::from(a)
                .and(d)
                .map_collect(|&a, &d| if a > 0. { d } else { 0. }),
            Sigmoid => Zip::from(a).and(d).map_collect(|&a, &d| d * a * (1. - a)),
            Softmax => {
                let dot = d.dot(a);
                Zip::from(a).and(d).map_collect(|&a, &d| a * (d - dot))
            }
        }
    }
}

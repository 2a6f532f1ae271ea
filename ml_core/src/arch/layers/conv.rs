use ndarray::{Array1, Array2, Array3, linalg, s};

use crate::{MlErr, Result};

/// A 2-D valid convolution with stride 1 and an optional ReLU.
///
/// Weights are stored as an im2col matrix `(kh * kw * in_ch, out_ch)` so the
/// forward pass is a single `general_mat_mul` over the unrolled input
/// patches, the same matrix path the dense layer uses.
#[derive(Clone, Debug)]
pub struct Conv2 {
    name: String,
    kernel: (usize, usize),
    in_ch: usize,
    out_ch: usize,
    weights: Array2<f32>,
    bias: Array1<f32>,
    relu: bool,
}

impl Conv2 {
    /// Creates a new `Conv2`.
    ///
    /// # Arguments
    /// * `name` - The layer's catalog name.
    /// * `kernel` - Kernel height and width.
    /// * `in_ch` / `out_ch` - Input and output channel counts.
    /// * `weights` - Flat kernel weights, `(kh, kw, in_ch, out_ch)` row-major.
    /// * `bias` - One bias per output channel.
    /// * `relu` - Whether a ReLU follows the convolution.
    pub fn new(
        name: impl Into<String>,
        kernel: (usize, usize),
        in_ch: usize,
        out_ch: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
        relu: bool,
    ) -> Result<Self> {
        let rows = kernel.0 * kernel.1 * in_ch;
        if rows == 0 || out_ch == 0 {
            return Err(MlErr::ShapeMismatch {
                what: "conv dimensions",
                got: rows * out_ch,
                expected: 1,
            });
        }
        if weights.len() != rows * out_ch {
            return Err(MlErr::ShapeMismatch {
                what: "conv weights",
                got: weights.len(),
                expected: rows * out_ch,
            });
        }
        if bias.len() != out_ch {
            return Err(MlErr::ShapeMismatch {
                what: "conv bias",
                got: bias.len(),
                expected: out_ch,
            });
        }

        let weights = Array2::from_shape_vec((rows, out_ch), weights).map_err(|_| {
            MlErr::ShapeMismatch {
                what: "conv weight layout",
                got: rows * out_ch,
                expected: rows * out_ch,
            }
        })?;

        Ok(Self {
            name: name.into(),
            kernel,
            in_ch,
            out_ch,
            weights,
            bias: Array1::from_vec(bias),
            relu,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    pub fn forward(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
        let (h, w, c) = x.dim();
        let (kh, kw) = self.kernel;

        if c != self.in_ch {
            return Err(MlErr::ShapeMismatch {
                what: "conv input channels",
                got: c,
                expected: self.in_ch,
            });
        }
        if h < kh || w < kw {
            return Err(MlErr::ShapeMismatch {
                what: "conv input extent",
                got: h.min(w),
                expected: kh.max(kw),
            });
        }

        let (oh, ow) = (h - kh + 1, w - kw + 1);
        let mut cols = Array2::zeros((oh * ow, kh * kw * c));
        for i in 0..oh {
            for j in 0..ow {
                let patch = x.slice(s![i..i + kh, j..j + kw, ..]);
                let mut row = cols.row_mut(i * ow + j);
                for (dst, &src) in row.iter_mut().zip(patch.iter()) {
                    *dst = src;
                }
            }
        }

        let mut out = Array2::zeros((oh * ow, self.out_ch));
        linalg::general_mat_mul(1.0, &cols, &self.weights, 0.0, &mut out);
        out += &self.bias;
        if self.relu {
            out.mapv_inplace(|v| v.max(0.));
        }

        out.into_shape_with_order((oh, ow, self.out_ch))
            .map_err(|_| MlErr::ShapeMismatch {
                what: "conv output layout",
                got: oh * ow * self.out_ch,
                expected: oh * ow * self.out_ch,
            })
    }
}

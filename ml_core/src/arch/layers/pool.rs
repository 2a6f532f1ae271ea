use ndarray::{Array1, Array3};

use crate::{MlErr, Result};

/// Square max pooling with stride equal to the pool size.
#[derive(Clone, Debug)]
pub struct MaxPool2 {
    name: String,
    pool: usize,
}

impl MaxPool2 {
    pub fn new(name: impl Into<String>, pool: usize) -> Result<Self> {
        if pool == 0 {
            return Err(MlErr::ShapeMismatch {
                what: "pool size",
                got: 0,
                expected: 1,
            });
        }

        Ok(Self {
            name: name.into(),
            pool,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
        let (h, w, c) = x.dim();
        let p = self.pool;
        let (oh, ow) = (h / p, w / p);

        if oh == 0 || ow == 0 {
            return Err(MlErr::ShapeMismatch {
                what: "pool input extent",
                got: h.min(w),
                expected: p,
            });
        }

        let mut y = Array3::zeros((oh, ow, c));
        for i in 0..oh {
            for j in 0..ow {
                for ch in 0..c {
                    let mut best = f32::NEG_INFINITY;
                    for di in 0..p {
                        for dj in 0..p {
                            best = best.max(x[[i * p + di, j * p + dj, ch]]);
                        }
                    }
                    y[[i, j, ch]] = best;
                }
            }
        }

        Ok(y)
    }

    /// Routes each output gradient back to its window's arg-max position.
    pub fn backward(&self, x: &Array3<f32>, d: &Array3<f32>) -> Result<Array3<f32>> {
        let (h, w, c) = x.dim();
        let p = self.pool;
        let (oh, ow, dc) = d.dim();

        if (oh, ow, dc) != (h / p, w / p, c) {
            return Err(MlErr::ShapeMismatch {
                what: "pool gradient extent",
                got: oh * ow * dc,
                expected: (h / p) * (w / p) * c,
            });
        }

        let mut dx = Array3::zeros((h, w, c));
        for i in 0..oh {
            for j in 0..ow {
                for ch in 0..c {
                    let mut best = (i * p, j * p);
                    let mut best_v = f32::NEG_INFINITY;
                    for di in 0..p {
                        for dj in 0..p {
                            let v = x[[i * p + di, j * p + dj, ch]];
                            if v > best_v {
                                best_v = v;
                                best = (i * p + di, j * p + dj);
                            }
                        }
                    }
                    dx[[best.0, best.1, ch]] += d[[i, j, ch]];
                }
            }
        }

        Ok(dx)
    }
}

/// Global average pooling: the spatial mean of every channel.
#[derive(Clone, Debug)]
pub struct GlobalAvgPool {
    name: String,
}

impl GlobalAvgPool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&self, x: &Array3<f32>) -> Array1<f32> {
        let (h, w, c) = x.dim();
        let hw = (h * w) as f32;

        Array1::from_iter(
            (0..c).map(|ch| x.index_axis(ndarray::Axis(2), ch).sum() / hw),
        )
    }

    /// Spreads each channel gradient evenly over the spatial positions.
    pub fn backward(&self, dim: (usize, usize, usize), d: &Array1<f32>) -> Result<Array3<f32>> {
        let (h, w, c) = dim;

        if d.len() != c {
            return Err(MlErr::ShapeMismatch {
                what: "global pool gradient",
                got: d.len(),
                expected: c,
            });
        }

        let hw = (h * w) as f32;
        let mut dx = Array3::zeros(dim);
        for ch in 0..c {
            dx.index_axis_mut(ndarray::Axis(2), ch).fill(d[ch] / hw);
        }

        Ok(dx)
    }
}

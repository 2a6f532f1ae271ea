use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire numeric substrate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The numeric substrate's error type.
#[derive(Debug)]
pub enum MlErr {
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    RankMismatch {
        layer: String,
        expected: &'static str,
    },
    BadBatch {
        got: usize,
    },
    EmptyNetwork,
    FlatOutputExpected,
    LayerOutOfBounds {
        got: usize,
        len: usize,
    },
    ClassOutOfBounds {
        got: usize,
        len: usize,
    },
    GradientUnsupported {
        layer: String,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                format!("There's a size mismatch in {what}, got {got} and expected {expected}")
            }
            MlErr::RankMismatch { layer, expected } => {
                format!("Layer {layer} was fed the wrong kind of value, it expects a {expected}")
            }
            MlErr::BadBatch { got } => {
                format!("Input tensors must carry a batch of exactly 1, got {got}")
            }
            MlErr::EmptyNetwork => "The network has no layers".to_string(),
            MlErr::FlatOutputExpected => {
                "The network's last layer did not produce a flat output vector".to_string()
            }
            MlErr::LayerOutOfBounds { got, len } => {
                format!("Layer index {got} is out of bounds for a network of {len} layers")
            }
            MlErr::ClassOutOfBounds { got, len } => {
                format!("Class index {got} is out of bounds for an output of length {len}")
            }
            MlErr::GradientUnsupported { layer } => {
                format!("Layer {layer} does not support gradient propagation")
            }
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {}

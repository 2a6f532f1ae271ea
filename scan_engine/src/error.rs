use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
};

use ml_core::MlErr;

/// The result type used in the entire scan pipeline.
pub type Result<T> = std::result::Result<T, ScanErr>;

/// The scan pipeline's error taxonomy.
///
/// Every stage absorbs its own failures and degrades; these values exist so
/// stages can tell each other *why* a fallback fired, not to escape the
/// service boundary.
#[derive(Debug)]
pub enum ScanErr {
    /// No trained model could be used; prediction falls back to heuristics.
    ModelUnavailable { reason: String },

    /// The source raster could not be decoded.
    ImageUnreadable { path: PathBuf, reason: String },

    /// No real gradient map could be produced; a mock heatmap substitutes.
    ExplanationUnavailable { reason: String },
}

impl Display for ScanErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanErr::ModelUnavailable { reason } => {
                write!(f, "no usable model is available: {reason}")
            }
            ScanErr::ImageUnreadable { path, reason } => {
                write!(f, "could not read image {}: {reason}", path.display())
            }
            ScanErr::ExplanationUnavailable { reason } => {
                write!(f, "could not compute an explanation: {reason}")
            }
        }
    }
}

impl Error for ScanErr {}

impl From<MlErr> for ScanErr {
    fn from(e: MlErr) -> Self {
        ScanErr::ExplanationUnavailable {
            reason: e.to_string(),
        }
    }
}

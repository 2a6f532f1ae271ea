//! Pure numeric substrate for scan classification: layers, activations,
//! sequential networks and the polymorphic model interface consumed by the
//! inference and explanation pipeline.

pub mod arch;
pub mod error;
mod test;

pub use arch::{
    ActFn, ClassificationModel, ImageTensor, LayerInfo, LayerRole, SequentialNet, Trace, Value,
};
pub use error::{MlErr, Result};

pub mod activations;
pub mod layers;
mod model;
mod sequential;

pub use activations::ActFn;
pub use model::{ClassificationModel, ImageTensor, LayerInfo, LayerRole, Trace, Value};
pub use sequential::SequentialNet;

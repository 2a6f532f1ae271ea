mod conv;
mod dense;
mod layer;
mod pool;

pub use conv::Conv2;
pub use dense::Dense;
pub use layer::{Flatten, Layer};
pub use pool::{GlobalAvgPool, MaxPool2};

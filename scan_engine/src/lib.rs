//! Tumor scan classification and explanation engine.
//!
//! Wires a persisted convolutional classifier (or its synthetic fallback)
//! to two boundary operations: `classify`, returning a label with a
//! confidence percentage, and `explain`, writing a gradient-based heatmap
//! overlay next to the scan. Every operation degrades instead of failing.

pub mod artifact;
pub mod config;
pub mod error;
pub mod gradcam;
pub mod mock;
pub mod overlay;
pub mod predict;
pub mod preprocess;
pub mod repository;
pub mod service;

pub use config::ScanConfig;
pub use error::{Result, ScanErr};
pub use gradcam::{ExplanationEngine, SaliencyMap};
pub use mock::MockExplanationGenerator;
pub use overlay::OverlayRenderer;
pub use predict::{Classification, Predictor, ScanLabel};
pub use preprocess::ImagePreprocessor;
pub use repository::ModelRepository;
pub use service::{ScanReport, ScanService};

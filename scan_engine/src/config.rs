use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Engine configuration. Every field has a default, so a partial (or
/// absent) config file still yields a working service.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Location of the persisted model artifact.
    pub model_path: PathBuf,
    /// Square model input resolution.
    pub input_size: u32,
    /// Overlay blend weight for the source raster.
    pub original_weight: f32,
    /// Overlay blend weight for the color-mapped heatmap.
    pub heatmap_weight: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("tumor_model.json"),
            input_size: 224,
            original_weight: 0.6,
            heatmap_weight: 0.4,
        }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_pipeline_contract() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.input_size, 224);
        assert!((cfg.original_weight - 0.6).abs() < 1e-6);
        assert!((cfg.heatmap_weight - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_fills_in_defaults() {
        let cfg: ScanConfig = serde_json::from_str(r#"{"input_size": 128}"#).unwrap();
        assert_eq!(cfg.input_size, 128);
        assert_eq!(cfg.model_path, PathBuf::from("tumor_model.json"));
    }
}

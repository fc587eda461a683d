use super::load_json;
use crate::analyzer::ZScanParams;
use crate::error::{Error, Result};
use crate::fit::VisibilityFitParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Seed the pattern period and source distance from a period-vs-distance
/// scan before the visibility fit.
#[derive(Clone, Debug, Deserialize)]
pub struct PeriodScan {
    pub z: Vec<f64>,
    pub period: Vec<f64>,
}

/// Either measured contrasts (`z` + `contrast`) or an image stack
/// (`images` + `z`, one distance per frame).
#[derive(Clone, Debug, Deserialize)]
pub struct CoherenceConfig {
    /// Detector distances, metres.
    pub z: Vec<f64>,
    #[serde(default)]
    pub contrast: Vec<f64>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Frame analysis of the image stack.
    #[serde(default)]
    pub stack: ZScanParams,
    /// eV
    pub photon_energy: f64,
    #[serde(default)]
    pub period_scan: Option<PeriodScan>,
    #[serde(default)]
    pub fit: VisibilityFitParams,
    #[serde(default)]
    pub json_out: Option<PathBuf>,
}

impl CoherenceConfig {
    pub fn uses_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Sample counts must match the distances of the chosen mode.
    pub fn validate(&self) -> Result<()> {
        let (what, len) = if self.uses_images() {
            ("images", self.images.len())
        } else {
            ("contrast", self.contrast.len())
        };
        if len != self.z.len() {
            return Err(Error::Config(format!(
                "{} distances for {len} {what} entries",
                self.z.len()
            )));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<CoherenceConfig> {
    let config: CoherenceConfig = load_json(path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ScanDirection;

    #[test]
    fn fit_section_falls_back_to_defaults() {
        let cfg: CoherenceConfig = serde_json::from_str(
            r#"{ "z": [0.1, 0.2], "contrast": [0.3, 0.1], "photon_energy": 8000.0,
                 "fit": { "source_distance": 60.0, "source_distance_fixed": false } }"#,
        )
        .unwrap();
        assert_eq!(cfg.fit.source_distance, 60.0);
        assert!(!cfg.fit.source_distance_fixed);
        assert!(cfg.fit.pattern_period_fixed);
        assert_eq!(cfg.fit.lm.max_iterations, 500);
        assert!(cfg.period_scan.is_none());
        assert!(!cfg.uses_images());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn image_stack_section_parses() {
        let cfg: CoherenceConfig = serde_json::from_str(
            r#"{ "z": [0.02, 0.025, 0.03], "images": ["a.tif", "b.tif", "c.tif"],
                 "photon_energy": 14000.0,
                 "stack": { "search_region": 4, "filter_size": 3, "direction": "vertical",
                            "source_distance_vertical": -0.73,
                            "experiment": { "pattern": "edge_pi" } } }"#,
        )
        .unwrap();
        assert!(cfg.uses_images());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.stack.search_region, 4);
        assert_eq!(cfg.stack.filter_size, 3);
        assert_eq!(cfg.stack.direction, ScanDirection::Vertical);
        assert_eq!(cfg.stack.source_distance_vertical, Some(-0.73));
        assert!(cfg.stack.source_distance_horizontal.is_none());
        assert_eq!(cfg.stack.experiment.grating_period, 4.8e-6);
    }

    #[test]
    fn mismatched_stack_is_rejected() {
        let cfg: CoherenceConfig = serde_json::from_str(
            r#"{ "z": [0.02, 0.025], "images": ["a.tif"], "photon_energy": 14000.0 }"#,
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}

//! Parameter types configuring the analyzer stages.
//!
//! Defaults describe a checkerboard grating of 4.8 µm period imaged at
//! 14 keV with 0.65 µm detector pixels, 0.33 m behind the grating and 32 m
//! from the source.
use crate::dpc::{wavelength, DpcCorrectionOptions};
use crate::harmonics::HarmonicPeriod;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

/// Orientation of the checkerboard relative to the detector axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GratingPattern {
    /// Checkerboard rotated 45°; the fringe period is `grating / √2`.
    #[default]
    DiagonalHalfPi,
    /// Checkerboard edges along the axes; the fringe period is `grating / 2`.
    EdgePi,
}

impl GratingPattern {
    /// Ratio of the projected fringe period to the grating period.
    pub fn period_factor(self) -> f64 {
        match self {
            Self::DiagonalHalfPi => FRAC_1_SQRT_2,
            Self::EdgePi => 0.5,
        }
    }
}

/// Beamline geometry and detector sampling; lengths in metres, energy in eV.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentParams {
    /// `[vertical, horizontal]` detector pixel size.
    pub pixel_size: [f64; 2],
    pub grating_period: f64,
    pub pattern: GratingPattern,
    pub dist_det_to_sample: f64,
    pub photon_energy: f64,
    pub source_distance: f64,
}

impl Default for ExperimentParams {
    fn default() -> Self {
        Self {
            pixel_size: [0.65e-6, 0.65e-6],
            grating_period: 4.8e-6,
            pattern: GratingPattern::default(),
            dist_det_to_sample: 0.33,
            photon_energy: 14e3,
            source_distance: 32.0,
        }
    }
}

impl ExperimentParams {
    pub fn wavelength(&self) -> f64 {
        wavelength(self.photon_energy)
    }

    /// Fringe period of the grating pattern in the grating plane.
    pub fn pattern_period(&self) -> f64 {
        self.grating_period * self.pattern.period_factor()
    }

    /// Expected harmonic period for an image of `rows × cols`, accounting for
    /// the pattern orientation and its magnification on the detector.
    pub fn harmonic_period(&self, rows: usize, cols: usize) -> HarmonicPeriod {
        let demag = self.source_distance / (self.source_distance + self.dist_det_to_sample);
        let pattern_period = self.pattern_period();
        let period = |pixel: f64, n: usize| (pixel / pattern_period * n as f64 * demag) as i64;
        HarmonicPeriod::new(
            period(self.pixel_size[0], rows),
            period(self.pixel_size[1], cols),
        )
    }
}

/// Harmonic search configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonicParams {
    /// Explicit period; `None` derives it from [`ExperimentParams`].
    pub period: Option<HarmonicPeriod>,
    /// Half-width of the peak search window.
    pub search_region: usize,
    /// Measure the period on the reference image before the analysis.
    pub refine_from_reference: bool,
    /// Search half-width used by that measurement.
    pub refine_search_region: usize,
}

impl Default for HarmonicParams {
    fn default() -> Self {
        Self {
            period: None,
            search_region: 10,
            refine_from_reference: true,
            refine_search_region: 30,
        }
    }
}

/// Analyzer-wide parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TalbotParams {
    pub experiment: ExperimentParams,
    pub harmonics: HarmonicParams,
    pub correction: DpcCorrectionOptions,
    /// Unwrap phases in 2D before combining them.
    pub unwrap_phase: bool,
    /// Half-aperture (pixels) of the central-profile curvature fit.
    pub fit_radius: Option<usize>,
    /// Integrate the corrected DPC maps into a phase map.
    pub integrate: bool,
    /// Subtract a second-order surface from the integrated phase.
    pub remove_2nd_order: bool,
}

impl Default for TalbotParams {
    fn default() -> Self {
        Self {
            experiment: ExperimentParams::default(),
            harmonics: HarmonicParams::default(),
            correction: DpcCorrectionOptions::default(),
            unwrap_phase: true,
            fit_radius: None,
            integrate: false,
            remove_2nd_order: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pattern_harmonic_period() {
        let p = ExperimentParams::default().harmonic_period(2160, 2560);
        // 0.65/(4.8/√2) * n * 32/32.33
        assert_eq!(p, HarmonicPeriod::new(409, 485));
    }

    #[test]
    fn edge_pattern_harmonic_period() {
        let params = ExperimentParams {
            pattern: GratingPattern::EdgePi,
            ..Default::default()
        };
        // 0.65/(4.8/2) * n * 32/32.33
        assert_eq!(params.harmonic_period(2160, 2560), HarmonicPeriod::new(579, 686));
    }

    #[test]
    fn pattern_deserializes_from_snake_case() {
        let p: ExperimentParams = serde_json::from_str(r#"{ "pattern": "edge_pi" }"#).unwrap();
        assert_eq!(p.pattern, GratingPattern::EdgePi);
        let p: ExperimentParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p.pattern, GratingPattern::DiagonalHalfPi);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let json = r#"{ "experiment": { "photon_energy": 8000.0 }, "unwrap_phase": false,
                        "correction": { "remove_mean": true } }"#;
        let p: TalbotParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.experiment.photon_energy, 8000.0);
        assert_eq!(p.experiment.dist_det_to_sample, 0.33);
        assert!(!p.unwrap_phase);
        assert!(p.correction.remove_mean && !p.correction.remove_linear);
        assert_eq!(p.harmonics.search_region, 10);
        assert!(TalbotParams::default().unwrap_phase);
    }
}

//! Source size and coherence length from visibility versus distance.
//!
//! Model, for detector distance `z`:
//!
//! ```text
//! p(z) = p0 (1 + (z - z0)/R)
//! csi  = λR / (2πσ)
//! f(z) = A exp(-(λ(z - z0))² / (csi p(z))²) |sin(πλ(z - z0) / (p0 p(z)))|
//! ```
//!
//! with amplitude `A`, pattern period `p0`, source sigma `σ`, source
//! distance `R` and distance offset `z0`.
use super::lm::{optimize, LmConfig, LmModel};
use crate::dpc::physics::wavelength;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Relative half-width of the band a "fixed" parameter may move in.
pub const FIXED_BAND: f64 = 1e-9;

const NAMES: [&str; 5] = ["amplitude", "pattern_period", "source_sigma", "source_distance", "z0"];

/// Fit configuration; lengths in metres.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityFitParams {
    pub pattern_period: f64,
    pub pattern_period_fixed: bool,
    pub pattern_period_bounds: [f64; 2],
    pub source_distance: f64,
    pub source_distance_fixed: bool,
    pub source_distance_bounds: [f64; 2],
    pub initial_amplitude: f64,
    pub initial_source_sigma: f64,
    pub initial_z0: f64,
    /// Only samples with `z_min <= z <= z_max` are fitted.
    pub z_range: Option<[f64; 2]>,
    pub lm: LmConfig,
}

impl Default for VisibilityFitParams {
    fn default() -> Self {
        Self {
            pattern_period: 2.4e-6,
            pattern_period_fixed: true,
            pattern_period_bounds: [1e-6, 1e-5],
            source_distance: 32.0,
            source_distance_fixed: true,
            source_distance_bounds: [1.0, 100.0],
            initial_amplitude: 1.0,
            initial_source_sigma: 1e-5,
            initial_z0: 1e-6,
            z_range: None,
            lm: LmConfig::default(),
        }
    }
}

/// Fitted model parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VisibilityParams {
    pub amplitude: f64,
    pub pattern_period: f64,
    pub source_sigma: f64,
    pub source_distance: f64,
    pub z0: f64,
}

impl VisibilityParams {
    fn from_array(p: [f64; 5]) -> Self {
        Self {
            amplitude: p[0],
            pattern_period: p[1],
            source_sigma: p[2],
            source_distance: p[3],
            z0: p[4],
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VisibilityFit {
    pub params: VisibilityParams,
    /// Fitted source sigma, metres.
    pub source_size: f64,
    /// `csi` at the fitted parameters, metres.
    pub coherence_length: f64,
    pub chi2: f64,
    pub iterations: usize,
    /// Fitted samples and the model evaluated on them.
    pub z: Vec<f64>,
    pub contrast: Vec<f64>,
    pub curve: Vec<f64>,
    pub envelope: Vec<f64>,
}

/// Visibility model at a fixed wavelength.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityModel {
    pub wavelength: f64,
}

impl VisibilityModel {
    pub fn coherence_length(&self, source_sigma: f64, source_distance: f64) -> f64 {
        self.wavelength * source_distance / (2.0 * PI * source_sigma)
    }

    fn pattern_period_at(z: f64, p: &VisibilityParams) -> f64 {
        p.pattern_period * (1.0 + (z - p.z0) / p.source_distance)
    }

    pub fn envelope(&self, z: f64, p: &VisibilityParams) -> f64 {
        let csi = self.coherence_length(p.source_sigma, p.source_distance);
        let pz = Self::pattern_period_at(z, p);
        let num = self.wavelength * (z - p.z0);
        p.amplitude * (-(num * num) / (csi * pz * csi * pz)).exp()
    }

    pub fn value(&self, z: f64, p: &VisibilityParams) -> f64 {
        let pz = Self::pattern_period_at(z, p);
        let arg = PI * self.wavelength * (z - p.z0) / (p.pattern_period * pz);
        self.envelope(z, p) * arg.sin().abs()
    }
}

impl LmModel<5> for VisibilityModel {
    fn evaluate(&self, x: f64, params: &[f64; 5]) -> f64 {
        self.value(x, &VisibilityParams::from_array(*params))
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        NAMES[index]
    }
}

/// `[value(1 - ε), value(1 + ε)]`, oriented so that low < high.
fn fixed_band(value: f64) -> [f64; 2] {
    if value > 0.0 {
        [value * (1.0 - FIXED_BAND), value * (1.0 + FIXED_BAND)]
    } else {
        [value * (1.0 + FIXED_BAND), value * (1.0 - FIXED_BAND)]
    }
}

fn free_band(bounds: [f64; 2], parameter: &'static str) -> Result<[f64; 2]> {
    if bounds[0] >= bounds[1] {
        return Err(Error::InvalidBounds {
            parameter,
            min: bounds[0],
            max: bounds[1],
        });
    }
    Ok(bounds)
}

/// Fit the visibility model to `(z, contrast)` measured at `photon_energy`.
pub fn fit_visibility(
    z: &[f64],
    contrast: &[f64],
    photon_energy: f64,
    params: &VisibilityFitParams,
) -> Result<VisibilityFit> {
    if z.len() != contrast.len() {
        return Err(Error::ShapeMismatch {
            expected: (z.len(), 1),
            actual: (contrast.len(), 1),
        });
    }
    let (zs, cs): (Vec<f64>, Vec<f64>) = z
        .iter()
        .zip(contrast)
        .filter(|(z, c)| {
            z.is_finite()
                && c.is_finite()
                && params
                    .z_range
                    .map_or(true, |[lo, hi]| **z >= lo && **z <= hi)
        })
        .map(|(z, c)| (*z, *c))
        .unzip();
    let (Some(&first), Some(&last)) = (zs.first(), zs.last()) else {
        return Err(Error::EmptyInput("no visibility samples in the z range"));
    };

    let shift_limit = 0.05 * (last - first).abs();
    let period_band = if params.pattern_period_fixed {
        fixed_band(params.pattern_period)
    } else {
        free_band(params.pattern_period_bounds, "pattern_period")?
    };
    let distance_band = if params.source_distance_fixed {
        fixed_band(params.source_distance)
    } else {
        free_band(params.source_distance_bounds, "source_distance")?
    };
    let lower = [1e-3, period_band[0], 1e-7, distance_band[0], -shift_limit];
    let upper = [2.0, period_band[1], 1e-3, distance_band[1], shift_limit];
    let initial = [
        params.initial_amplitude,
        params.pattern_period,
        params.initial_source_sigma,
        params.source_distance,
        params.initial_z0,
    ];

    let model = VisibilityModel {
        wavelength: wavelength(photon_energy),
    };
    let result = optimize(&model, &zs, &cs, initial, lower, upper, &params.lm)?;
    let fitted = VisibilityParams::from_array(result.params);
    let coherence_length = model.coherence_length(fitted.source_sigma, fitted.source_distance);
    log::info!(
        "visibility fit: source size {:.3e} m, coherence length {:.3e} m after {} iterations",
        fitted.source_sigma,
        coherence_length,
        result.iterations
    );

    let curve = zs.iter().map(|&z| model.value(z, &fitted)).collect();
    let envelope = zs.iter().map(|&z| model.envelope(z, &fitted)).collect();
    Ok(VisibilityFit {
        params: fitted,
        source_size: fitted.source_sigma,
        coherence_length,
        chi2: result.chi2,
        iterations: result.iterations,
        z: zs,
        contrast: cs,
        curve,
        envelope,
    })
}

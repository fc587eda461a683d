//! Wavefront radius of curvature from DPC line profiles.
use super::linear::{polyfit1, LinearFit};
use crate::error::{Axis, Error, Result};
use crate::image::ImageF64;
use serde::Serialize;
use std::f64::consts::PI;

#[derive(Clone, Debug, Serialize)]
pub struct CurvatureFit {
    pub axis: Axis,
    /// Row (horizontal) or column (vertical) of the 1/4, 1/2, 3/4 profiles.
    pub positions: [usize; 3],
    /// Centered physical coordinate along the profile, metres.
    pub coordinates: Vec<f64>,
    pub profiles: [Vec<f64>; 3],
    /// Fit of the central profile.
    pub fit: LinearFit,
    /// `k / slope`, metres.
    pub radius: f64,
}

/// Fit the central profile of `dpc` along `axis`.
///
/// `dpc` is in rad/m sampled every `pixel_size` metres; the horizontal fit
/// reads rows of the 01 map, the vertical fit columns of the 10 map. With
/// `fit_radius` only the `±fit_radius` pixels around the centre enter the
/// fit.
pub fn fit_curvature(
    dpc: &ImageF64,
    axis: Axis,
    pixel_size: f64,
    wavelength: f64,
    fit_radius: Option<usize>,
) -> Result<CurvatureFit> {
    if dpc.is_empty() {
        return Err(Error::EmptyInput("DPC map for curvature fit"));
    }
    let (rows, cols) = dpc.shape();
    let (across, along) = match axis {
        Axis::Horizontal => (rows, cols),
        Axis::Vertical => (cols, rows),
    };
    let positions = [across / 4, across / 2, 3 * across / 4];
    let profile = |at: usize| -> Vec<f64> {
        match axis {
            Axis::Horizontal => dpc.row(at).to_vec(),
            Axis::Vertical => dpc.column(at),
        }
    };
    let profiles = positions.map(profile);
    let coordinates: Vec<f64> = (0..along)
        .map(|k| (k as f64 - (along / 2) as f64) * pixel_size)
        .collect();

    let (lo, hi) = match fit_radius {
        Some(r) => ((along / 2).saturating_sub(r), (along / 2 + r + 1).min(along)),
        None => (0, along),
    };
    let fit = polyfit1(&coordinates[lo..hi], &profiles[1][lo..hi])?;
    let kwave = 2.0 * PI / wavelength;
    let radius = kwave / fit.slope;
    log::debug!("curvature {axis}: slope {:.4e} rad/m², radius {radius:.4} m", fit.slope);

    Ok(CurvatureFit {
        axis,
        positions,
        coordinates,
        profiles,
        fit,
        radius,
    })
}

//! DPC correction chain: π-jump, mean and linear-trend removal, plus the
//! quadratic-surface removal applied to integrated phase maps.
//!
//! DPC maps are converted to fringe angles `dpc / vps · z·hc/E` (the
//! horizontal map with the horizontal virtual pixel, the vertical one with
//! the vertical pixel), corrected, and converted back. The linear trend is
//! removed from the DPC maps themselves. Steps run in the fixed order
//! π-jump, mean, linear; each is optional.
use super::physics::{DpcMaps, HC};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Axis, Error, Result};
use crate::fit::{polyfit1, LinearFit};
use crate::image::ImageF64;
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpcCorrectionOptions {
    pub correct_pi_jump: bool,
    pub remove_mean: bool,
    pub remove_linear: bool,
}

/// What the chain measured and removed, `[horizontal, vertical]`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CorrectionReport {
    pub initial_mean_angle_over_pi: [f64; 2],
    pub pi_jump: [i64; 2],
    pub pi_jump_removed: bool,
    pub removed_mean: Option<[f64; 2]>,
    pub linear_fit: [Option<LinearFit>; 2],
}

/// `round(mean(angle/π))` over finite pixels, 0 for an all-NaN map.
pub fn pi_jump(angle: &ImageF64) -> i64 {
    angle
        .finite_mean()
        .map_or(0, |m| (m / PI).round() as i64)
}

/// Subtract the finite mean; returns the map and the removed mean.
pub fn remove_mean(map: &ImageF64) -> (ImageF64, f64) {
    let mut out = map.clone();
    let mean = map.finite_mean().unwrap_or(0.0);
    out.offset(-mean);
    (out, mean)
}

/// Least-squares `a·s + b` along `axis` over finite pixels, subtracted from
/// the map. `s` is the centered coordinate `(k - n/2)·pixel_size`; NaN pixels
/// stay NaN.
pub fn remove_linear_trend(
    map: &ImageF64,
    axis: Axis,
    pixel_size: f64,
) -> Result<(ImageF64, LinearFit)> {
    let (rows, cols) = map.shape();
    let coord = |x: usize, y: usize| match axis {
        Axis::Horizontal => (x as f64 - (cols / 2) as f64) * pixel_size,
        Axis::Vertical => (y as f64 - (rows / 2) as f64) * pixel_size,
    };
    let mut xs = Vec::with_capacity(map.data.len());
    for y in 0..rows {
        for x in 0..cols {
            xs.push(coord(x, y));
        }
    }
    let fit = polyfit1(&xs, &map.data)?;
    let out = ImageF64::from_fn(cols, rows, |x, y| {
        let v = map.get(x, y);
        if v.is_finite() {
            v - fit.eval(coord(x, y))
        } else {
            v
        }
    });
    Ok((out, fit))
}

/// `c + cx·x + cy·y + cxx·x² + cxy·x·y + cyy·y²`, coordinates in metres from
/// the map center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QuadraticSurface {
    pub c: f64,
    pub cx: f64,
    pub cy: f64,
    pub cxx: f64,
    pub cxy: f64,
    pub cyy: f64,
}

impl QuadraticSurface {
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.c + self.cx * x + self.cy * y + self.cxx * x * x + self.cxy * x * y + self.cyy * y * y
    }
}

/// Least-squares second-order surface over the finite pixels, subtracted
/// from the map. `pixel_size` is `[vertical, horizontal]`; NaN pixels stay
/// NaN.
///
/// The fit runs on coordinates normalized to the half extent and the
/// coefficients are rescaled to metres afterwards.
pub fn remove_2nd_order(
    map: &ImageF64,
    pixel_size: [f64; 2],
) -> Result<(ImageF64, QuadraticSurface)> {
    let (rows, cols) = map.shape();
    let half_x = (cols / 2).max(1) as f64;
    let half_y = (rows / 2).max(1) as f64;
    let coord = |x: usize, y: usize| {
        (
            (x as f64 - (cols / 2) as f64) / half_x,
            (y as f64 - (rows / 2) as f64) / half_y,
        )
    };
    let basis = |u: f64, v: f64| SVector::<f64, 6>::new(1.0, u, v, u * u, u * v, v * v);

    let mut ata = SMatrix::<f64, 6, 6>::zeros();
    let mut atb = SVector::<f64, 6>::zeros();
    let mut count = 0usize;
    for y in 0..rows {
        for x in 0..cols {
            let value = map.get(x, y);
            if !value.is_finite() {
                continue;
            }
            let (u, v) = coord(x, y);
            let b = basis(u, v);
            ata += b * b.transpose();
            atb += b * value;
            count += 1;
        }
    }
    if count < 6 {
        return Err(Error::EmptyInput(
            "fewer than six finite pixels for a quadratic fit",
        ));
    }
    let a = ata
        .lu()
        .solve(&atb)
        .ok_or(Error::SingularFit("quadratic normal equations"))?;

    let out = ImageF64::from_fn(cols, rows, |x, y| {
        let v = map.get(x, y);
        if v.is_finite() {
            let (u, w) = coord(x, y);
            v - basis(u, w).dot(&a)
        } else {
            v
        }
    });
    let sx = half_x * pixel_size[1];
    let sy = half_y * pixel_size[0];
    let surface = QuadraticSurface {
        c: a[0],
        cx: a[1] / sx,
        cy: a[2] / sy,
        cxx: a[3] / (sx * sx),
        cxy: a[4] / (sx * sy),
        cyy: a[5] / (sy * sy),
    };
    Ok((out, surface))
}

/// Run the enabled corrections on `maps`.
pub fn correct(
    maps: &DpcMaps,
    distance: f64,
    photon_energy: f64,
    options: &DpcCorrectionOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<(DpcMaps, CorrectionReport)> {
    maps.dpc01.ensure_same_shape(&maps.dpc10)?;
    let vps = maps.virtual_pixel_size;
    let factor = distance * HC / photon_energy;
    // [horizontal, vertical]
    let pixel = [vps[1], vps[0]];
    let mut angle = [
        maps.dpc01.map(|v| v / pixel[0] * factor),
        maps.dpc10.map(|v| v / pixel[1] * factor),
    ];
    let to_dpc = |a: &ImageF64, p: f64| a.map(|v| v * p / factor);

    let mean_over_pi = |a: &ImageF64| a.finite_mean().map_or(f64::NAN, |m| m / PI);
    let mut report = CorrectionReport {
        initial_mean_angle_over_pi: [mean_over_pi(&angle[0]), mean_over_pi(&angle[1])],
        pi_jump: [pi_jump(&angle[0]), pi_jump(&angle[1])],
        ..CorrectionReport::default()
    };
    sink.info(&format!(
        "Initial mean angle/π: {:.4} horizontal, {:.4} vertical",
        report.initial_mean_angle_over_pi[0], report.initial_mean_angle_over_pi[1]
    ));

    let mut dpc01 = maps.dpc01.clone();
    let mut dpc10 = maps.dpc10.clone();

    if options.correct_pi_jump && report.pi_jump.iter().any(|&j| j != 0) {
        for (a, &j) in angle.iter_mut().zip(&report.pi_jump) {
            a.offset(-(j as f64) * PI);
        }
        dpc01 = to_dpc(&angle[0], pixel[0]);
        dpc10 = to_dpc(&angle[1], pixel[1]);
        report.pi_jump_removed = true;
        sink.info(&format!(
            "Removed π jump: {} horizontal, {} vertical",
            report.pi_jump[0], report.pi_jump[1]
        ));
    }

    if options.remove_mean {
        let (h, mh) = remove_mean(&angle[0]);
        let (v, mv) = remove_mean(&angle[1]);
        angle = [h, v];
        dpc01 = to_dpc(&angle[0], pixel[0]);
        dpc10 = to_dpc(&angle[1], pixel[1]);
        report.removed_mean = Some([mh, mv]);
        sink.info(&format!(
            "Removed mean angle: {mh:.4e} horizontal, {mv:.4e} vertical"
        ));
    }

    if options.remove_linear {
        for (axis, map, p, slot) in [
            (Axis::Horizontal, &mut dpc01, pixel[0], 0usize),
            (Axis::Vertical, &mut dpc10, pixel[1], 1usize),
        ] {
            if map.all_non_finite() {
                sink.warning(&format!("No finite {axis} DPC values; skipping linear fit"));
                continue;
            }
            let (residual, fit) = remove_linear_trend(map, axis, p)?;
            *map = residual;
            sink.info(&format!(
                "Removed linear {axis} DPC component: slope {:.4e}, offset {:.4e}",
                fit.slope, fit.intercept
            ));
            report.linear_fit[slot] = Some(fit);
        }
    }

    Ok((
        DpcMaps {
            dpc01,
            dpc10,
            virtual_pixel_size: vps,
        },
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const VPS: [f64; 2] = [3e-6, 2e-6];
    const DIST: f64 = 0.3;
    const ENERGY: f64 = 12e3;

    fn factor() -> f64 {
        DIST * HC / ENERGY
    }

    fn maps_from_angles(h: f64, v: f64) -> DpcMaps {
        DpcMaps {
            dpc01: ImageF64::from_fn(8, 6, |x, _| (h + 0.01 * x as f64) * VPS[1] / factor()),
            dpc10: ImageF64::filled(8, 6, v * VPS[0] / factor()),
            virtual_pixel_size: VPS,
        }
    }

    #[test]
    fn mean_removal_is_idempotent() {
        let map = ImageF64::from_fn(7, 5, |x, y| (x * y) as f64 * 0.3 - 1.0);
        let (once, _) = remove_mean(&map);
        let (twice, second_mean) = remove_mean(&once);
        assert!(second_mean.abs() < 1e-12);
        for (a, b) in once.data.iter().zip(&twice.data) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_trend_is_removed() {
        let mut rng = StdRng::seed_from_u64(7);
        let (a, b, ps) = (3.7e4, -12.0, 1.5e-6);
        let map = ImageF64::from_fn(40, 30, |x, _| {
            a * (x as f64 - 20.0) * ps + b + rng.gen_range(-0.01..0.01)
        });
        let (residual, fit) = remove_linear_trend(&map, Axis::Horizontal, ps).unwrap();
        assert!((fit.slope - a).abs() / a < 1e-2);
        let xs: Vec<f64> = (0..40 * 30).map(|k| ((k % 40) as f64 - 20.0) * ps).collect();
        let again = polyfit1(&xs, &residual.data).unwrap();
        assert!(again.slope.abs() < 1e-6 * a);
        assert!(again.intercept.abs() < 1e-9);
    }

    #[test]
    fn linear_trend_keeps_nan_mask() {
        let mut map = ImageF64::from_fn(10, 10, |_, y| 2.0 * y as f64);
        map.set(3, 4, f64::NAN);
        let (out, fit) = remove_linear_trend(&map, Axis::Vertical, 1.0).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!(out.get(3, 4).is_nan());
        assert!(out.get(5, 5).abs() < 1e-12);
    }

    #[test]
    fn quadratic_surface_is_removed() {
        let ps = [2e-6, 1e-6];
        let truth = QuadraticSurface {
            c: 0.5,
            cx: 3e3,
            cy: -1e3,
            cxx: 4e8,
            cxy: -2e8,
            cyy: 1e8,
        };
        let mut map = ImageF64::from_fn(40, 30, |x, y| {
            truth.eval((x as f64 - 20.0) * ps[1], (y as f64 - 15.0) * ps[0])
        });
        map.set(7, 9, f64::NAN);
        let (residual, fit) = remove_2nd_order(&map, ps).unwrap();

        let rel = |a: f64, b: f64| ((a - b) / b).abs();
        assert!(rel(fit.cxx, truth.cxx) < 1e-6, "cxx {:.6e}", fit.cxx);
        assert!(rel(fit.cxy, truth.cxy) < 1e-6, "cxy {:.6e}", fit.cxy);
        assert!(rel(fit.cyy, truth.cyy) < 1e-6, "cyy {:.6e}", fit.cyy);
        assert!(rel(fit.cx, truth.cx) < 1e-6);
        assert!((fit.c - truth.c).abs() < 1e-9);
        assert!(residual.get(7, 9).is_nan());
        assert!(residual
            .data
            .iter()
            .filter(|v| v.is_finite())
            .all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn quadratic_fit_needs_six_finite_pixels() {
        let mut map = ImageF64::filled(3, 3, f64::NAN);
        for x in 0..3 {
            map.set(x, 0, 1.0);
        }
        assert!(matches!(
            remove_2nd_order(&map, [1.0, 1.0]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn pi_jump_is_removed_when_enabled() {
        let maps = maps_from_angles(PI + 0.02, 0.1);
        let mut sink = RecordingSink::new();
        let options = DpcCorrectionOptions {
            correct_pi_jump: true,
            ..DpcCorrectionOptions::default()
        };
        let (out, report) = correct(&maps, DIST, ENERGY, &options, &mut sink).unwrap();
        assert_eq!(report.pi_jump, [1, 0]);
        assert!(report.pi_jump_removed);
        let angle0 = out.dpc01.get(0, 0) / VPS[1] * factor();
        assert!((angle0 - 0.02).abs() < 1e-9);
        let angle_v = out.dpc10.get(0, 0) / VPS[0] * factor();
        assert!((angle_v - 0.1).abs() < 1e-9);
    }

    #[test]
    fn disabled_chain_is_identity() {
        let maps = maps_from_angles(PI + 0.02, -0.5);
        let mut sink = RecordingSink::new();
        let (out, report) =
            correct(&maps, DIST, ENERGY, &DpcCorrectionOptions::default(), &mut sink).unwrap();
        assert_eq!(out.dpc01, maps.dpc01);
        assert_eq!(out.dpc10, maps.dpc10);
        assert!(!report.pi_jump_removed);
        assert!(report.linear_fit.iter().all(Option::is_none));
    }

    #[test]
    fn linear_step_skips_missing_axis() {
        let mut maps = maps_from_angles(0.1, 0.0);
        maps.dpc10 = ImageF64::filled(8, 6, f64::NAN);
        let mut sink = RecordingSink::new();
        let options = DpcCorrectionOptions {
            remove_linear: true,
            ..DpcCorrectionOptions::default()
        };
        let (out, report) = correct(&maps, DIST, ENERGY, &options, &mut sink).unwrap();
        assert!(report.linear_fit[0].is_some() && report.linear_fit[1].is_none());
        assert!(out.dpc10.all_non_finite());
        assert_eq!(sink.count(crate::diagnostics::Level::Warning), 1);
    }

    #[test]
    fn full_chain_leaves_zero_mean_no_slope() {
        let maps = maps_from_angles(0.4, 0.25);
        let mut sink = RecordingSink::new();
        let options = DpcCorrectionOptions {
            correct_pi_jump: true,
            remove_mean: true,
            remove_linear: true,
        };
        let (out, report) = correct(&maps, DIST, ENERGY, &options, &mut sink).unwrap();
        assert!(report.removed_mean.is_some());
        assert!(report.linear_fit.iter().all(Option::is_some));
        let scale = maps.dpc01.data.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(out.dpc01.data.iter().all(|v| v.abs() < 1e-9 * scale));
        assert!(out.dpc10.finite_mean().unwrap().abs() < 1e-9 * scale);
    }
}

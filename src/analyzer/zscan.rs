//! Coherence z-scan over a stack of grating images.
//!
//! Each frame, taken at detector distance `z`, yields its experimental
//! harmonic period and first-harmonic visibility. Per axis, the pattern
//! period in metres (`pixel * extent / harmonic_period`) is fitted linearly
//! against `z` to seed the pattern period and source distance, and the
//! visibilities are then fitted with the coherence model.
use super::params::ExperimentParams;
use crate::diagnostics::DiagnosticSink;
use crate::error::{Axis, Error, Result};
use crate::fit::{
    fit_pattern_period, fit_visibility, PatternPeriodFit, VisibilityFit, VisibilityFitParams,
};
use crate::harmonics::{
    experimental_period, first_harmonic_visibility, HarmonicIndex, HarmonicPeriod, Visibility,
};
use crate::image::ImageF64;
use serde::{Deserialize, Serialize};

/// Axes to fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    Vertical,
    Horizontal,
    #[default]
    Both,
}

impl ScanDirection {
    pub fn axes(self) -> &'static [Axis] {
        match self {
            Self::Vertical => &[Axis::Vertical],
            Self::Horizontal => &[Axis::Horizontal],
            Self::Both => &[Axis::Vertical, Axis::Horizontal],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScanParams {
    /// Geometry; `dist_det_to_sample` is replaced by each frame's `z`.
    pub experiment: ExperimentParams,
    /// Explicit harmonic period for every frame instead of the geometry.
    pub period: Option<HarmonicPeriod>,
    /// Half-width of the peak searches.
    pub search_region: usize,
    /// Box filter width applied to `|spectrum|` before reading amplitudes.
    pub filter_size: usize,
    pub direction: ScanDirection,
    /// Source distance for the vertical fit, overriding the period fit.
    pub source_distance_vertical: Option<f64>,
    /// Source distance for the horizontal fit, overriding the period fit.
    pub source_distance_horizontal: Option<f64>,
}

impl Default for ZScanParams {
    fn default() -> Self {
        Self {
            experiment: ExperimentParams::default(),
            period: None,
            search_region: 1,
            filter_size: 1,
            direction: ScanDirection::default(),
            source_distance_vertical: None,
            source_distance_horizontal: None,
        }
    }
}

impl ZScanParams {
    fn source_distance(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Vertical => self.source_distance_vertical,
            Axis::Horizontal => self.source_distance_horizontal,
        }
    }
}

/// Measurements of one frame.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZScanFrame {
    pub z: f64,
    pub harmonic_period: HarmonicPeriod,
    /// `[vertical, horizontal]` pattern period on the detector, metres; NaN
    /// on a 1D axis.
    pub pattern_period: [f64; 2],
    pub visibility: Visibility,
}

impl ZScanFrame {
    fn pattern_period_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.pattern_period[0],
            Axis::Horizontal => self.pattern_period[1],
        }
    }

    fn contrast_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.visibility.vertical,
            Axis::Horizontal => self.visibility.horizontal,
        }
    }
}

/// Fits along one axis.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisCoherence {
    pub axis: Axis,
    /// `None` when the pattern period does not vary over the scan.
    pub period_fit: Option<PatternPeriodFit>,
    pub visibility: VisibilityFit,
}

/// Measure the harmonic period and visibility of `image` taken at `z`.
pub fn measure_frame(
    image: &ImageF64,
    z: f64,
    params: &ZScanParams,
    sink: &mut dyn DiagnosticSink,
) -> Result<ZScanFrame> {
    if image.is_empty() {
        return Err(Error::EmptyInput("z-scan frame"));
    }
    let (rows, cols) = image.shape();
    let theory = params.period.unwrap_or_else(|| {
        ExperimentParams {
            dist_det_to_sample: z,
            ..params.experiment.clone()
        }
        .harmonic_period(rows, cols)
    });

    let region = params.search_region;
    let mut period = theory;
    if theory.horizontal > 0 {
        period.horizontal =
            experimental_period(image, theory, HarmonicIndex::H01, region, sink)?.horizontal;
    }
    if theory.vertical > 0 {
        period.vertical =
            experimental_period(image, theory, HarmonicIndex::H10, region, sink)?.vertical;
    }
    let visibility = first_harmonic_visibility(image, period, region, params.filter_size)?;

    let pixel = params.experiment.pixel_size;
    let metres = |pixel: f64, extent: usize, p: i64| {
        if p > 0 {
            pixel * extent as f64 / p as f64
        } else {
            f64::NAN
        }
    };
    let frame = ZScanFrame {
        z,
        harmonic_period: period,
        pattern_period: [
            metres(pixel[0], rows, period.vertical),
            metres(pixel[1], cols, period.horizontal),
        ],
        visibility,
    };
    sink.info(&format!(
        "z = {z:.4e} m: harmonic period {} x {}, visibility {:.4} vertical, {:.4} horizontal",
        period.vertical, period.horizontal, visibility.vertical, visibility.horizontal
    ));
    Ok(frame)
}

/// Visibility-fit parameters for `axis`, seeded from the linear period fit.
///
/// The fit sets `pattern_period` and `source_distance`; a configured per-axis
/// source distance takes precedence. A period fit that fails is reported as a
/// warning and leaves `fit` unseeded.
pub fn seed_axis(
    frames: &[ZScanFrame],
    axis: Axis,
    params: &ZScanParams,
    fit: &VisibilityFitParams,
    sink: &mut dyn DiagnosticSink,
) -> (VisibilityFitParams, Option<PatternPeriodFit>) {
    let z: Vec<f64> = frames.iter().map(|f| f.z).collect();
    let period: Vec<f64> = frames.iter().map(|f| f.pattern_period_along(axis)).collect();
    let mut seeded = fit.clone();
    let period_fit = match fit_pattern_period(&z, &period) {
        Ok(seed) => {
            sink.info(&format!(
                "{axis} pattern period {:.4e} m, source distance {:.4} m from period fit",
                seed.pattern_period, seed.source_distance
            ));
            seeded.pattern_period = seed.pattern_period;
            seeded.source_distance = seed.source_distance;
            Some(seed)
        }
        Err(err) => {
            sink.warning(&format!("{axis} period fit skipped: {err}"));
            None
        }
    };
    if let Some(distance) = params.source_distance(axis) {
        seeded.source_distance = distance;
    }
    (seeded, period_fit)
}

/// Seed and run the visibility fit on each configured axis of a measured
/// stack.
pub fn fit_stack(
    frames: &[ZScanFrame],
    photon_energy: f64,
    params: &ZScanParams,
    fit: &VisibilityFitParams,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<AxisCoherence>> {
    if frames.is_empty() {
        return Err(Error::EmptyInput("z-scan stack"));
    }
    let z: Vec<f64> = frames.iter().map(|f| f.z).collect();
    let mut out = Vec::with_capacity(2);
    for &axis in params.direction.axes() {
        let (axis_params, period_fit) = seed_axis(frames, axis, params, fit, sink);
        let contrast: Vec<f64> = frames.iter().map(|f| f.contrast_along(axis)).collect();
        let visibility = fit_visibility(&z, &contrast, photon_energy, &axis_params)?;
        out.push(AxisCoherence {
            axis,
            period_fit,
            visibility,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Level, RecordingSink};
    use std::f64::consts::PI;

    fn mesh(size: usize, cycles: usize, contrast: f64) -> ImageF64 {
        let k = 2.0 * PI * cycles as f64 / size as f64;
        ImageF64::from_fn(size, size, |x, y| {
            1.0 + contrast * (k * x as f64).cos() + contrast * (k * y as f64).cos()
        })
    }

    #[test]
    fn frame_period_and_visibility() {
        let params = ZScanParams {
            period: Some(HarmonicPeriod::new(16, 16)),
            search_region: 3,
            experiment: ExperimentParams {
                pixel_size: [1e-6, 2e-6],
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sink = RecordingSink::new();
        let frame = measure_frame(&mesh(128, 17, 0.3), 0.1, &params, &mut sink).unwrap();
        assert_eq!(frame.harmonic_period, HarmonicPeriod::new(17, 17));
        assert!((frame.visibility.horizontal - 0.3).abs() < 1e-9);
        assert!((frame.visibility.vertical - 0.3).abs() < 1e-9);
        assert!((frame.pattern_period[0] - 128e-6 / 17.0).abs() < 1e-15);
        assert!((frame.pattern_period[1] - 256e-6 / 17.0).abs() < 1e-15);
    }

    #[test]
    fn one_d_axis_has_no_pattern_period() {
        let params = ZScanParams {
            period: Some(HarmonicPeriod::new(0, 16)),
            search_region: 3,
            ..Default::default()
        };
        let k = 2.0 * PI * 16.0 / 128.0;
        let image = ImageF64::from_fn(128, 128, |x, _| 1.0 + 0.4 * (k * x as f64).cos());
        let frame = measure_frame(&image, 0.1, &params, &mut RecordingSink::new()).unwrap();
        assert!(frame.pattern_period[0].is_nan());
        assert!(frame.pattern_period[1].is_finite());
    }

    #[test]
    fn constant_period_leaves_fit_unseeded() {
        let params = ZScanParams {
            period: Some(HarmonicPeriod::new(16, 16)),
            search_region: 3,
            source_distance_horizontal: Some(2.0),
            ..Default::default()
        };
        let mut sink = RecordingSink::new();
        let frames: Vec<ZScanFrame> = [0.1, 0.2, 0.3]
            .iter()
            .map(|&z| measure_frame(&mesh(128, 16, 0.3), z, &params, &mut sink).unwrap())
            .collect();
        let defaults = VisibilityFitParams::default();

        let (seeded, period_fit) =
            seed_axis(&frames, Axis::Horizontal, &params, &defaults, &mut sink);
        assert!(period_fit.is_none());
        assert_eq!(seeded.pattern_period, defaults.pattern_period);
        assert_eq!(seeded.source_distance, 2.0);
        assert!(sink
            .messages(Level::Warning)
            .any(|m| m.starts_with("horizontal period fit skipped")));

        let (seeded, _) = seed_axis(&frames, Axis::Vertical, &params, &defaults, &mut sink);
        assert_eq!(seeded.source_distance, defaults.source_distance);
    }

    #[test]
    fn empty_stack_is_rejected() {
        let err = fit_stack(
            &[],
            14e3,
            &ZScanParams::default(),
            &VisibilityFitParams::default(),
            &mut RecordingSink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }
}

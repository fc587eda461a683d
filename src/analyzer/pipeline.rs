//! Analyzer driving a single-grating Talbot analysis end-to-end.
//!
//! The [`TalbotAnalyzer`] exposes a simple API: feed a sample frame (and
//! optionally a reference frame) and get intensity, dark-field and corrected
//! DPC maps with curvature fits. Internally it refines the harmonic period
//! on the reference, reconstructs the harmonic images, combines them into
//! observables, converts phases to DPC, runs the correction chain and fits
//! the central DPC profiles.
//!
//! Typical usage:
//! ```no_run
//! use talbot_wavefront::{TalbotAnalyzer, TalbotParams};
//! use talbot_wavefront::image::ImageF64;
//!
//! # fn example(sample: ImageF64, reference: ImageF64) -> talbot_wavefront::Result<()> {
//! let analyzer = TalbotAnalyzer::new(TalbotParams::default());
//! let report = analyzer.process_with_diagnostics(&sample, Some(&reference))?;
//! for fit in report.summary.curvature.iter().flatten() {
//!     println!("{} radius: {:.3} m", fit.axis, fit.radius);
//! }
//! # Ok(())
//! # }
//! ```
use super::params::TalbotParams;
use crate::analysis::{analyze, ObservableSet};
use crate::diagnostics::{
    AnalysisReport, AnalysisSummary, DiagnosticSink, InputDescriptor, LogSink, RecordingSink,
    TimingBreakdown,
};
use crate::dpc::{
    correct, integrate_dpc, length_sensitivity, phase_to_dpc, remove_2nd_order,
    virtual_pixel_size, DpcMaps,
};
use crate::error::{Axis, Error, Result};
use crate::fit::{fit_curvature, CurvatureFit};
use crate::harmonics::{
    experimental_period, first_harmonic_visibility, reconstruct, HarmonicIndex, HarmonicPeriod,
};
use crate::image::ImageF64;
use log::debug;
use std::time::Instant;

/// Maps produced by one analysis.
#[derive(Clone, Debug)]
pub struct TalbotResult {
    pub observables: ObservableSet,
    /// DPC maps after the correction chain.
    pub dpc: DpcMaps,
    /// Integrated phase, when enabled.
    pub phase: Option<ImageF64>,
}

pub struct TalbotAnalyzer {
    params: TalbotParams,
}

impl TalbotAnalyzer {
    pub fn new(params: TalbotParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TalbotParams {
        &self.params
    }

    /// Run the analysis, reporting diagnostics through `log`.
    pub fn process(&self, sample: &ImageF64, reference: Option<&ImageF64>) -> Result<TalbotResult> {
        let mut timings = TimingBreakdown::default();
        self.run(sample, reference, &mut LogSink, &mut timings)
            .map(|(result, _)| result)
    }

    /// Run the analysis and keep diagnostics, timings and fit summaries.
    pub fn process_with_diagnostics(
        &self,
        sample: &ImageF64,
        reference: Option<&ImageF64>,
    ) -> Result<AnalysisReport> {
        let mut sink = RecordingSink::new();
        let mut timings = TimingBreakdown::default();
        let total_start = Instant::now();
        let (result, summary) = self.run(sample, reference, &mut sink, &mut timings)?;
        timings.total_ms = crate::diagnostics::elapsed_ms(total_start);
        Ok(AnalysisReport {
            result,
            summary,
            diagnostics: sink.into_records(),
            timings,
        })
    }

    fn run(
        &self,
        sample: &ImageF64,
        reference: Option<&ImageF64>,
        sink: &mut dyn DiagnosticSink,
        timings: &mut TimingBreakdown,
    ) -> Result<(TalbotResult, AnalysisSummary)> {
        if sample.is_empty() {
            return Err(Error::EmptyInput("sample image"));
        }
        if let Some(r) = reference {
            sample.ensure_same_shape(r)?;
        }
        let (rows, cols) = sample.shape();
        let exp = &self.params.experiment;
        let hp = &self.params.harmonics;
        debug!(
            "TalbotAnalyzer::process start rows={} cols={} reference={}",
            rows,
            cols,
            reference.is_some()
        );

        let mut period = hp
            .period
            .unwrap_or_else(|| exp.harmonic_period(rows, cols));
        if let (Some(r), true) = (reference, hp.refine_from_reference) {
            period = timings.time("period", || -> Result<HarmonicPeriod> {
                self.refine_period(r, period, sink)
            })?;
        }
        sink.info(&format!(
            "Harmonic period: {} vertical, {} horizontal",
            period.vertical, period.horizontal
        ));

        let (sample_h, reference_h) = timings.time("harmonics", || -> Result<_> {
            let s = reconstruct(sample, period, hp.search_region, sink)?;
            let r = match reference {
                Some(r) => Some(reconstruct(r, period, hp.search_region, sink)?),
                None => None,
            };
            Ok((s, r))
        })?;

        let visibility = first_harmonic_visibility(
            reference.unwrap_or(sample),
            period,
            hp.search_region,
            1,
        )?;
        sink.info(&format!(
            "First-harmonic visibility: {:.4} horizontal, {:.4} vertical",
            visibility.horizontal, visibility.vertical
        ));

        let observables = timings.time("analysis", || {
            analyze(&sample_h, reference_h.as_ref(), self.params.unwrap_phase, sink)
        })?;

        let harmonic_shape = sample_h.shape();
        let vps = virtual_pixel_size(exp.pixel_size, (rows, cols), harmonic_shape);
        let sensitivity = length_sensitivity(vps, exp.dist_det_to_sample, exp.photon_energy);
        sink.info(&format!(
            "Virtual pixel size: {:.4e} x {:.4e} m; length sensitivity {:.4e} m ({:.3} λ)",
            vps[0], vps[1], sensitivity.metres, sensitivity.wavelengths
        ));

        let (dpc, correction) = timings.time("dpc", || -> Result<_> {
            let raw = phase_to_dpc(
                &observables.phase01,
                &observables.phase10,
                vps,
                exp.dist_det_to_sample,
                exp.photon_energy,
            )?;
            correct(
                &raw,
                exp.dist_det_to_sample,
                exp.photon_energy,
                &self.params.correction,
                sink,
            )
        })?;

        let curvature = timings.time("curvature", || {
            [
                self.fit_axis(&dpc.dpc01, Axis::Horizontal, vps[1], sink),
                self.fit_axis(&dpc.dpc10, Axis::Vertical, vps[0], sink),
            ]
        });

        let mut phase_surface = None;
        let phase = if self.params.integrate {
            let mut phase = timings.time("integration", || {
                integrate_dpc(&dpc.dpc01, &dpc.dpc10, vps)
            })?;
            if self.params.remove_2nd_order {
                let (flat, surface) = remove_2nd_order(&phase, vps)?;
                sink.info(&format!(
                    "Removed 2nd order phase: cxx {:.4e}, cxy {:.4e}, cyy {:.4e} rad/m²",
                    surface.cxx, surface.cxy, surface.cyy
                ));
                phase = flat;
                phase_surface = Some(surface);
            }
            Some(phase)
        } else {
            None
        };

        let mut peaks = sample_h.peaks.clone();
        if let Some(r) = &reference_h {
            peaks.extend(r.peaks.iter().copied());
        }
        let summary = AnalysisSummary {
            input: InputDescriptor {
                rows,
                cols,
                has_reference: reference.is_some(),
            },
            mode: observables.mode,
            harmonic_period: period,
            harmonic_shape,
            peaks,
            visibility,
            virtual_pixel_size: vps,
            wavelength: exp.wavelength(),
            length_sensitivity: sensitivity,
            correction,
            curvature,
            phase_surface,
        };
        Ok((
            TalbotResult {
                observables,
                dpc,
                phase,
            },
            summary,
        ))
    }

    /// Measure the 01 (horizontal) and 10 (vertical) periods on the
    /// reference; 1D axes keep their period.
    ///
    /// A measured period `<= 0` (typically the DC peak caught inside the
    /// search window) is reported as a warning and the axis keeps its input
    /// period instead of silently turning into a 1D grating.
    fn refine_period(
        &self,
        reference: &ImageF64,
        period: HarmonicPeriod,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<HarmonicPeriod> {
        let region = self.params.harmonics.refine_search_region;
        let mut refined = period;
        if period.horizontal > 0 {
            sink.info("Obtain harmonic 01 experimentally");
            let measured =
                experimental_period(reference, period, HarmonicIndex::H01, region, sink)?
                    .horizontal;
            refined.horizontal =
                checked_refinement(Axis::Horizontal, period.horizontal, measured, region, sink);
        }
        if period.vertical > 0 {
            sink.info("Obtain harmonic 10 experimentally");
            let measured =
                experimental_period(reference, period, HarmonicIndex::H10, region, sink)?.vertical;
            refined.vertical =
                checked_refinement(Axis::Vertical, period.vertical, measured, region, sink);
        }
        Ok(refined)
    }

    fn fit_axis(
        &self,
        dpc: &ImageF64,
        axis: Axis,
        pixel_size: f64,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<CurvatureFit> {
        let wavelength = self.params.experiment.wavelength();
        match fit_curvature(dpc, axis, pixel_size, wavelength, self.params.fit_radius) {
            Ok(fit) => {
                sink.info(&format!("Curvature radius {axis}: {:.4} m", fit.radius));
                Some(fit)
            }
            Err(err) => {
                sink.warning(&format!("Curvature fit {axis} skipped: {err}"));
                None
            }
        }
    }
}

fn checked_refinement(
    axis: Axis,
    input: i64,
    measured: i64,
    search_region: usize,
    sink: &mut dyn DiagnosticSink,
) -> i64 {
    if measured > 0 {
        return measured;
    }
    sink.warning(&format!(
        "Refined {axis} harmonic period {measured} is not positive; the DC peak may lie \
         inside the {search_region} pixel search region. Keeping {input}"
    ));
    input
}

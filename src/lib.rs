#![doc = include_str!("../README.md")]

// Analyzer, configuration and image plumbing.
pub mod analyzer;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;

// Processing stages, each callable on its own.
pub mod analysis;
pub mod dpc;
pub mod fit;
pub mod harmonics;
pub mod spectral;

// Grating interferometry entry points.
pub use crate::analyzer::{
    ExperimentParams, GratingPattern, HarmonicParams, TalbotAnalyzer, TalbotParams, TalbotResult,
};
pub use crate::error::{Error, Result};

// Run reports and warning sinks.
pub use crate::diagnostics::{AnalysisReport, AnalysisSummary, DiagnosticSink};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use talbot_wavefront::prelude::*;
///
/// # fn main() -> talbot_wavefront::Result<()> {
/// let (w, h) = (512usize, 512usize);
/// let frame = ImageF64::from_fn(w, h, |x, y| {
///     let k = 2.0 * std::f64::consts::PI / 16.0;
///     1.0 + 0.5 * (k * x as f64).cos() + 0.5 * (k * y as f64).cos()
/// });
///
/// let analyzer = TalbotAnalyzer::new(TalbotParams {
///     harmonics: HarmonicParams {
///         period: Some(HarmonicPeriod::new(32, 32)),
///         ..Default::default()
///     },
///     ..Default::default()
/// });
///
/// let result = analyzer.process(&frame, None)?;
/// println!("dark field mean: {:?}", result.observables.dark_field01.finite_mean());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::harmonics::{HarmonicIndex, HarmonicPeriod};
    pub use crate::image::{ImageC64, ImageF64};
    pub use crate::{HarmonicParams, TalbotAnalyzer, TalbotParams, TalbotResult};
}

/// Per-stage functions in pipeline order: spectrum, harmonics, phase
/// analysis, DPC correction and fits.
pub mod stages {
    pub use crate::analysis::{analyze, unwrap_phase, ObservableSet};
    pub use crate::analyzer::zscan::{fit_stack, measure_frame};
    pub use crate::dpc::{
        correct, integrate_dpc, phase_to_dpc, remove_2nd_order, DpcCorrectionOptions, DpcMaps,
    };
    pub use crate::fit::{fit_curvature, fit_pattern_period, fit_visibility, VisibilityFitParams};
    pub use crate::harmonics::{
        experimental_index, experimental_period, extract, first_harmonic_visibility, peak_error,
        reconstruct, theoretical_index, validate_in_range, HarmonicImages,
    };
    pub use crate::spectral::{forward, inverse};
}

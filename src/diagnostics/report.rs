use super::sink::Diagnostic;
use super::timing::TimingBreakdown;
use crate::analysis::AnalysisMode;
use crate::analyzer::TalbotResult;
use crate::dpc::{CorrectionReport, LengthSensitivity, QuadraticSurface};
use crate::fit::CurvatureFit;
use crate::harmonics::{HarmonicPeak, HarmonicPeriod, Visibility};
use serde::Serialize;

/// Result produced by [`TalbotAnalyzer::process_with_diagnostics`](crate::TalbotAnalyzer).
///
/// The maps stay in `result`; everything else serializes to the JSON report.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(skip)]
    pub result: TalbotResult,
    pub summary: AnalysisSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub timings: TimingBreakdown,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub input: InputDescriptor,
    pub mode: AnalysisMode,
    pub harmonic_period: HarmonicPeriod,
    /// `(rows, cols)` of the harmonic images.
    pub harmonic_shape: (usize, usize),
    /// Sample peaks first, then reference peaks.
    pub peaks: Vec<HarmonicPeak>,
    /// Fringe visibility of the reference frame (the sample without one).
    pub visibility: Visibility,
    pub virtual_pixel_size: [f64; 2],
    pub wavelength: f64,
    pub length_sensitivity: LengthSensitivity,
    pub correction: CorrectionReport,
    /// `[horizontal, vertical]`
    pub curvature: [Option<CurvatureFit>; 2],
    /// Surface removed from the integrated phase, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_surface: Option<QuadraticSurface>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub rows: usize,
    pub cols: usize,
    pub has_reference: bool,
}

impl AnalysisSummary {
    /// Multi-line human-readable summary.
    pub fn to_text(&self) -> String {
        let fmt_radius = |fit: &Option<CurvatureFit>| {
            fit.as_ref()
                .map(|f| format!("{:.4} m", f.radius))
                .unwrap_or_else(|| "-".to_string())
        };
        let mut out = String::new();
        out.push_str(&format!(
            "input {}x{} ({:?} mode)\n",
            self.input.rows, self.input.cols, self.mode
        ));
        out.push_str(&format!(
            "harmonic period {} x {} -> harmonic images {} x {}\n",
            self.harmonic_period.vertical,
            self.harmonic_period.horizontal,
            self.harmonic_shape.0,
            self.harmonic_shape.1
        ));
        for peak in &self.peaks {
            out.push_str(&format!(
                "  peak {}: error ({}, {})\n",
                peak.harmonic, peak.error.di, peak.error.dj
            ));
        }
        out.push_str(&format!(
            "visibility {:.4} horizontal, {:.4} vertical\n",
            self.visibility.horizontal, self.visibility.vertical
        ));
        out.push_str(&format!(
            "virtual pixel {:.3e} x {:.3e} m, wavelength {:.4e} m\n",
            self.virtual_pixel_size[0], self.virtual_pixel_size[1], self.wavelength
        ));
        out.push_str(&format!(
            "pi jump [{}, {}]\n",
            self.correction.pi_jump[0], self.correction.pi_jump[1]
        ));
        out.push_str(&format!(
            "curvature radius: horizontal {}, vertical {}\n",
            fmt_radius(&self.curvature[0]),
            fmt_radius(&self.curvature[1])
        ));
        out
    }
}

//! Intensity, dark-field and differential phase from harmonic images.
//!
//! Without a reference the observables are absolute (`|img|`, `angle`);
//! with a reference they are sample/reference intensity ratios and phase
//! differences. Harmonics that do not exist yield all-NaN maps.
use super::unwrap::unwrap_phase;
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::harmonics::HarmonicImages;
use crate::image::{ImageC64, ImageF64};
use serde::Serialize;
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Absolute,
    Relative,
}

/// Per-analysis observables, all with the shape of the harmonic images.
#[derive(Clone, Debug)]
pub struct ObservableSet {
    pub mode: AnalysisMode,
    pub int00: ImageF64,
    pub int01: ImageF64,
    pub int10: ImageF64,
    pub dark_field01: ImageF64,
    pub dark_field10: ImageF64,
    pub phase01: ImageF64,
    pub phase10: ImageF64,
}

/// Combine sample (and optional reference) harmonics into observables.
///
/// With `unwrap` set, every phase is unwrapped on its own before the
/// sample/reference difference, and the result is re-centred by removing
/// `round(mean(phase/π))·π`.
pub fn analyze(
    sample: &HarmonicImages,
    reference: Option<&HarmonicImages>,
    unwrap: bool,
    sink: &mut dyn DiagnosticSink,
) -> Result<ObservableSet> {
    let shape = sample.shape();
    if let Some(r) = reference {
        sample.h00.ensure_same_shape(&r.h00)?;
    }
    let (rows, cols) = shape;
    let nan_map = || ImageF64::filled(cols, rows, f64::NAN);
    let phase_of = |img: &ImageC64| {
        let wrapped = img.arg();
        if unwrap {
            unwrap_phase(&wrapped)
        } else {
            wrapped
        }
    };

    let mode = if reference.is_some() {
        AnalysisMode::Relative
    } else {
        AnalysisMode::Absolute
    };
    sink.info(&format!(
        "Analyzing harmonics in {} mode{}",
        match mode {
            AnalysisMode::Absolute => "absolute",
            AnalysisMode::Relative => "relative",
        },
        if unwrap { " with phase unwrapping" } else { "" }
    ));

    let intensity = |s: Option<&ImageC64>, r: Option<Option<&ImageC64>>| -> Result<ImageF64> {
        match (s, r) {
            (Some(s), None) => Ok(s.norm()),
            (Some(s), Some(Some(r))) => s.zip_map(r, |a, b| a.norm() / b.norm()),
            _ => Ok(nan_map()),
        }
    };
    let phase = |s: Option<&ImageC64>, r: Option<Option<&ImageC64>>| -> Result<ImageF64> {
        match (s, r) {
            (Some(s), None) => Ok(phase_of(s)),
            (Some(s), Some(Some(r))) => phase_of(s).zip_map(&phase_of(r), |a, b| a - b),
            _ => Ok(nan_map()),
        }
    };

    let ref00 = reference.map(|r| Some(&r.h00));
    let ref01 = reference.map(|r| r.h01.as_ref());
    let ref10 = reference.map(|r| r.h10.as_ref());

    let int00 = intensity(Some(&sample.h00), ref00)?;
    let int01 = intensity(sample.h01.as_ref(), ref01)?;
    let int10 = intensity(sample.h10.as_ref(), ref10)?;

    let mut phase01 = phase(sample.h01.as_ref(), ref01)?;
    let mut phase10 = phase(sample.h10.as_ref(), ref10)?;

    if unwrap {
        remove_pi_bias(&mut phase01);
        remove_pi_bias(&mut phase10);
    }

    let dark_field01 = int01.zip_map(&int00, |a, b| a / b)?;
    let dark_field10 = int10.zip_map(&int00, |a, b| a / b)?;

    Ok(ObservableSet {
        mode,
        int00,
        int01,
        int10,
        dark_field01,
        dark_field10,
        phase01,
        phase10,
    })
}

/// Subtract `round(mean(phase/π))·π`; all-NaN maps are left alone.
pub fn remove_pi_bias(phase: &mut ImageF64) {
    if let Some(mean) = phase.finite_mean() {
        let jump = (mean / PI).round();
        if jump != 0.0 {
            log::debug!("removing {jump}π phase bias");
            phase.offset(-jump * PI);
        }
    }
}

//! Sub-band extraction around a harmonic peak.
use super::peak::{experimental_index, theoretical_index};
use super::types::{HarmonicIndex, HarmonicPeriod, PeakError, PeakIndex};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Axis, Error, Result};
use crate::image::ImageC64;
use num_complex::Complex64;
use serde::Serialize;

/// Cropped spectrum of one harmonic together with its peak bookkeeping.
#[derive(Clone, Debug)]
pub struct HarmonicSubSpectrum {
    pub harmonic: HarmonicIndex,
    pub data: ImageC64,
    pub theoretical: PeakIndex,
    pub experimental: PeakIndex,
    pub error: PeakError,
}

impl HarmonicSubSpectrum {
    pub fn peak(&self) -> HarmonicPeak {
        HarmonicPeak {
            harmonic: self.harmonic,
            theoretical: self.theoretical,
            experimental: self.experimental,
            error: self.error,
        }
    }
}

/// Serializable peak summary of an extracted harmonic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HarmonicPeak {
    pub harmonic: HarmonicIndex,
    pub theoretical: PeakIndex,
    pub experimental: PeakIndex,
    pub error: PeakError,
}

/// Fail when the sub-band of `harmonic` would cross the Nyquist boundary.
pub fn validate_in_range(
    harmonic: HarmonicIndex,
    rows: usize,
    cols: usize,
    period: HarmonicPeriod,
) -> Result<()> {
    let eff = period.resolve(rows, cols);
    if (harmonic.v as f64 + 0.5) * eff.vertical as f64 > rows as f64 / 2.0 {
        return Err(Error::HarmonicOutOfRange {
            harmonic,
            axis: Axis::Vertical,
        });
    }
    if (harmonic.h as f64 + 0.5) * eff.horizontal as f64 > cols as f64 / 2.0 {
        return Err(Error::HarmonicOutOfRange {
            harmonic,
            axis: Axis::Horizontal,
        });
    }
    Ok(())
}

/// Whether `harmonic` can exist for this period: a non-zero order along an
/// axis whose period spans the whole image (1D grating) does not.
pub fn harmonic_exists(
    harmonic: HarmonicIndex,
    rows: usize,
    cols: usize,
    period: HarmonicPeriod,
) -> bool {
    let eff = period.resolve(rows, cols);
    let vertical_ok = harmonic.v == 0 || eff.vertical < rows as i64;
    let horizontal_ok = harmonic.h == 0 || eff.horizontal < cols as i64;
    vertical_ok && horizontal_ok
}

/// Crop the band centered on the theoretical peak.
///
/// The window spans `theoretical ± period / 2` on each axis with integer
/// halving, so it is `P` wide for an even period and `P - 1` wide for an
/// odd one.
///
/// The experimental peak is searched for diagnostics only. Samples of the
/// window falling outside the spectrum are NaN.
pub fn extract(
    spectrum: &ImageC64,
    harmonic: HarmonicIndex,
    period: HarmonicPeriod,
    search_region: usize,
    sink: &mut dyn DiagnosticSink,
) -> Result<HarmonicSubSpectrum> {
    let (rows, cols) = spectrum.shape();
    if spectrum.is_empty() {
        return Err(Error::EmptyInput("spectrum"));
    }
    sink.info(&format!("Extracting harmonic {harmonic}"));

    let eff = period.resolve(rows, cols);
    if eff.vertical_1d {
        sink.info("Assuming Horizontal 1D Grating");
    }
    if eff.horizontal_1d {
        sink.info("Assuming Vertical 1D Grating");
    }
    sink.info(&format!(
        "Harmonic period: {} vertical, {} horizontal pixels",
        eff.vertical, eff.horizontal
    ));

    if let Err(err) = validate_in_range(harmonic, rows, cols, period) {
        sink.error(&err.to_string());
        return Err(err);
    }

    let theoretical = theoretical_index(harmonic, rows, cols, period);
    let experimental = experimental_index(spectrum, harmonic, period, search_region);
    let error = PeakError {
        di: experimental.i - theoretical.i,
        dj: experimental.j - theoretical.j,
    };
    sink.info(&format!(
        "Harmonic peak {harmonic} misplaced by {} vertical, {} horizontal pixels (theoretical {},{})",
        error.di, error.dj, theoretical.i, theoretical.j
    ));
    if error.is_misplaced(search_region) {
        sink.warning(&format!(
            "Harmonic peak {harmonic} is too far from theoretical value: {} pixels vertical, {} pixels horizontal",
            error.di, error.dj
        ));
    }

    let data = crop_window(
        spectrum,
        theoretical.i - eff.vertical / 2,
        theoretical.i + eff.vertical / 2,
        theoretical.j - eff.horizontal / 2,
        theoretical.j + eff.horizontal / 2,
    );
    Ok(HarmonicSubSpectrum {
        harmonic,
        data,
        theoretical,
        experimental,
        error,
    })
}

fn crop_window(spectrum: &ImageC64, i0: i64, i1: i64, j0: i64, j1: i64) -> ImageC64 {
    let (rows, cols) = spectrum.shape();
    let h = (i1 - i0).max(0) as usize;
    let w = (j1 - j0).max(0) as usize;
    let nan = Complex64::new(f64::NAN, f64::NAN);
    ImageC64::from_fn(w, h, |x, y| {
        let i = i0 + y as i64;
        let j = j0 + x as i64;
        if i >= 0 && j >= 0 && (i as usize) < rows && (j as usize) < cols {
            spectrum.get(j as usize, i as usize)
        } else {
            nan
        }
    })
}

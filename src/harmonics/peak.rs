//! Harmonic peak location in a DC-centered spectrum.
//!
//! The theoretical index of order `(v, h)` sits `v` vertical and `h`
//! horizontal periods away from DC. The experimental index is the maximum of
//! `|spectrum|` inside a `2*search_region` square around it; it only feeds
//! diagnostics and the period refinement, never the crop position.
use super::types::{HarmonicIndex, HarmonicPeriod, PeakError, PeakIndex};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::image::{ImageC64, ImageF64};
use crate::spectral;

/// `(rows/2 + v*pv, cols/2 + h*ph)` after the 1D-grating fallback.
pub fn theoretical_index(
    harmonic: HarmonicIndex,
    rows: usize,
    cols: usize,
    period: HarmonicPeriod,
) -> PeakIndex {
    let eff = period.resolve(rows, cols);
    PeakIndex::new(
        (rows / 2) as i64 + harmonic.v as i64 * eff.vertical,
        (cols / 2) as i64 + harmonic.h as i64 * eff.horizontal,
    )
}

/// Index of the largest spectral magnitude inside the search window.
///
/// The window `[ti - r, ti + r) × [tj - r, tj + r)` is clipped to the
/// spectrum; non-finite samples are skipped and ties resolve to the first
/// cell in row-major order. An empty window returns the theoretical index.
pub fn experimental_index(
    spectrum: &ImageC64,
    harmonic: HarmonicIndex,
    period: HarmonicPeriod,
    search_region: usize,
) -> PeakIndex {
    let (rows, cols) = spectrum.shape();
    let theory = theoretical_index(harmonic, rows, cols, period);
    let r = search_region as i64;

    let i0 = (theory.i - r).clamp(0, rows as i64) as usize;
    let i1 = (theory.i + r).clamp(0, rows as i64) as usize;
    let j0 = (theory.j - r).clamp(0, cols as i64) as usize;
    let j1 = (theory.j + r).clamp(0, cols as i64) as usize;

    let mut best: Option<(f64, usize, usize)> = None;
    for i in i0..i1 {
        for (dj, c) in spectrum.row(i)[j0..j1].iter().enumerate() {
            let mag = c.norm();
            if !mag.is_finite() {
                continue;
            }
            match best {
                Some((m, _, _)) if mag <= m => {}
                _ => best = Some((mag, i, j0 + dj)),
            }
        }
    }
    best.map_or(theory, |(_, i, j)| PeakIndex::new(i as i64, j as i64))
}

/// Experimental minus theoretical peak index.
pub fn peak_error(
    spectrum: &ImageC64,
    harmonic: HarmonicIndex,
    period: HarmonicPeriod,
    search_region: usize,
) -> PeakError {
    let (rows, cols) = spectrum.shape();
    let theory = theoretical_index(harmonic, rows, cols, period);
    let found = experimental_index(spectrum, harmonic, period, search_region);
    PeakError {
        di: found.i - theory.i,
        dj: found.j - theory.j,
    }
}

/// Refine the harmonic period from where `harmonic` is actually found.
///
/// Returns the effective period shifted by the measured peak error; only the
/// axis along which `harmonic` has a non-zero order is meaningful.
pub fn experimental_period(
    image: &ImageF64,
    period: HarmonicPeriod,
    harmonic: HarmonicIndex,
    search_region: usize,
    sink: &mut dyn DiagnosticSink,
) -> Result<HarmonicPeriod> {
    if image.is_empty() {
        return Err(Error::EmptyInput("image for period estimation"));
    }
    let (rows, cols) = image.shape();
    let eff = period.resolve(rows, cols);
    if eff.vertical_1d {
        sink.info("Assuming Horizontal 1D Grating");
    }
    if eff.horizontal_1d {
        sink.info("Assuming Vertical 1D Grating");
    }

    let spectrum = spectral::forward(image);
    let err = peak_error(&spectrum, harmonic, period, search_region);
    sink.info(&format!(
        "Error experimental harmonics {harmonic}: {} vertical, {} horizontal",
        err.di, err.dj
    ));
    Ok(HarmonicPeriod::new(
        eff.vertical + err.di,
        eff.horizontal + err.dj,
    ))
}

//! Real-space harmonic images 00, 01 and 10 of a single-grating frame.
use super::extract::{extract, harmonic_exists, HarmonicPeak};
use super::types::{HarmonicIndex, HarmonicPeriod};
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::image::{ImageC64, ImageF64};
use crate::spectral;

/// Complex harmonic images; `None` marks a harmonic that does not exist for
/// the configured grating (1D along that axis) or whose band is undefined.
#[derive(Clone, Debug)]
pub struct HarmonicImages {
    pub h00: ImageC64,
    pub h01: Option<ImageC64>,
    pub h10: Option<ImageC64>,
    /// Peak bookkeeping of every harmonic that was extracted.
    pub peaks: Vec<HarmonicPeak>,
}

impl HarmonicImages {
    /// `(rows, cols)` of the harmonic images.
    pub fn shape(&self) -> (usize, usize) {
        self.h00.shape()
    }

    pub fn get(&self, harmonic: HarmonicIndex) -> Option<&ImageC64> {
        match (harmonic.v, harmonic.h) {
            (0, 0) => Some(&self.h00),
            (0, 1) => self.h01.as_ref(),
            (1, 0) => self.h10.as_ref(),
            _ => None,
        }
    }
}

/// Transform `image`, extract the 00/01/10 bands and bring each back to
/// real space.
pub fn reconstruct(
    image: &ImageF64,
    period: HarmonicPeriod,
    search_region: usize,
    sink: &mut dyn DiagnosticSink,
) -> Result<HarmonicImages> {
    if image.is_empty() {
        return Err(Error::EmptyInput("image"));
    }
    let spectrum = spectral::forward(image);
    let mut peaks = Vec::with_capacity(3);

    let sub00 = extract(&spectrum, HarmonicIndex::H00, period, search_region, sink)?;
    peaks.push(sub00.peak());
    let h00 = spectral::inverse(&sub00.data);

    let mut first_order = |harmonic: HarmonicIndex| -> Result<Option<ImageC64>> {
        let (rows, cols) = spectrum.shape();
        if !harmonic_exists(harmonic, rows, cols, period) {
            sink.info(&format!(
                "Harmonic {harmonic} does not exist for a 1D grating along this axis"
            ));
            return Ok(None);
        }
        let sub = extract(&spectrum, harmonic, period, search_region, sink)?;
        peaks.push(sub.peak());
        if sub.data.all_non_finite() {
            sink.warning(&format!(
                "Harmonic {harmonic} band is entirely non-finite; skipping inverse transform"
            ));
            return Ok(None);
        }
        Ok(Some(spectral::inverse(&sub.data)))
    };

    let h01 = first_order(HarmonicIndex::H01)?;
    let h10 = first_order(HarmonicIndex::H10)?;
    log::debug!(
        "reconstructed harmonics: 00 {:?}, 01 {}, 10 {}",
        h00.shape(),
        h01.is_some(),
        h10.is_some()
    );

    Ok(HarmonicImages {
        h00,
        h01,
        h10,
        peaks,
    })
}

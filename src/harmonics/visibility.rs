//! Fringe visibility from the first-harmonic to DC amplitude ratio.
use super::peak::experimental_index;
use super::types::{HarmonicIndex, HarmonicPeriod, PeakIndex};
use crate::error::{Error, Result};
use crate::image::ImageF64;
use crate::spectral;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Visibility {
    /// `2*|01| / |00|`
    pub horizontal: f64,
    /// `2*|10| / |00|`
    pub vertical: f64,
    pub peak00: PeakIndex,
    pub peak01: PeakIndex,
    pub peak10: PeakIndex,
}

/// Visibility of the 01 and 10 harmonics of `image`.
///
/// Peaks are located on the raw magnitude; when `filter_size > 1` the
/// amplitudes are read from a box-filtered magnitude.
pub fn first_harmonic_visibility(
    image: &ImageF64,
    period: HarmonicPeriod,
    search_region: usize,
    filter_size: usize,
) -> Result<Visibility> {
    if image.is_empty() {
        return Err(Error::EmptyInput("image for visibility"));
    }
    let spectrum = spectral::forward(image);
    let peak00 = experimental_index(&spectrum, HarmonicIndex::H00, period, search_region);
    let peak10 = experimental_index(&spectrum, HarmonicIndex::H10, period, search_region);
    let peak01 = experimental_index(&spectrum, HarmonicIndex::H01, period, search_region);

    let mut magnitude = spectrum.norm();
    if filter_size > 1 {
        magnitude = box_filter(&magnitude, filter_size);
    }
    let (rows, cols) = magnitude.shape();
    let at = |p: PeakIndex| -> f64 {
        if p.i < 0 || p.j < 0 || p.i as usize >= rows || p.j as usize >= cols {
            f64::NAN
        } else {
            magnitude.get(p.j as usize, p.i as usize)
        }
    };
    let a00 = at(peak00);
    Ok(Visibility {
        horizontal: 2.0 * at(peak01) / a00,
        vertical: 2.0 * at(peak10) / a00,
        peak00,
        peak01,
        peak10,
    })
}

/// Separable uniform filter of width `size` with mirrored borders
/// (`d c b a | a b c d | d c b a`).
pub fn box_filter(image: &ImageF64, size: usize) -> ImageF64 {
    if size <= 1 || image.is_empty() {
        return image.clone();
    }
    let rows_done = ImageF64 {
        w: image.w,
        h: image.h,
        data: (0..image.h)
            .flat_map(|y| filter_line(image.row(y), size))
            .collect(),
    };
    let mut out = rows_done.clone();
    for x in 0..image.w {
        let filtered = filter_line(&rows_done.column(x), size);
        for (y, v) in filtered.into_iter().enumerate() {
            out.set(x, y, v);
        }
    }
    out
}

fn filter_line(line: &[f64], size: usize) -> Vec<f64> {
    let n = line.len() as i64;
    let lo = -((size / 2) as i64);
    let hi = lo + size as i64;
    let mirror = |k: i64| -> usize {
        let period = 2 * n;
        let m = k.rem_euclid(period);
        (if m < n { m } else { period - 1 - m }) as usize
    };
    (0..n)
        .map(|c| {
            let sum: f64 = (lo..hi).map(|o| line[mirror(c + o)]).sum();
            sum / size as f64
        })
        .collect()
}

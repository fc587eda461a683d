use serde::{Deserialize, Serialize};
use std::fmt;

/// Diffraction order `(v, h)`; `00` is the DC band, `01`/`10` the first
/// orders along the horizontal and vertical axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HarmonicIndex {
    pub v: usize,
    pub h: usize,
}

impl HarmonicIndex {
    pub const H00: Self = Self { v: 0, h: 0 };
    pub const H01: Self = Self { v: 0, h: 1 };
    pub const H10: Self = Self { v: 1, h: 0 };

    pub const fn new(v: usize, h: usize) -> Self {
        Self { v, h }
    }
}

impl fmt::Display for HarmonicIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.v, self.h)
    }
}

/// Harmonic periods in spectrum pixels. A value `<= 0` marks a 1D grating
/// along that axis; the period then spans the whole image extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonicPeriod {
    pub vertical: i64,
    pub horizontal: i64,
}

impl HarmonicPeriod {
    pub const fn new(vertical: i64, horizontal: i64) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }

    /// Apply the 1D-grating fallback for an image of `rows × cols`.
    pub fn resolve(&self, rows: usize, cols: usize) -> EffectivePeriod {
        let vertical_1d = self.vertical <= 0;
        let horizontal_1d = self.horizontal <= 0;
        EffectivePeriod {
            vertical: if vertical_1d { rows as i64 } else { self.vertical },
            horizontal: if horizontal_1d {
                cols as i64
            } else {
                self.horizontal
            },
            vertical_1d,
            horizontal_1d,
        }
    }

    /// Map a period measured on the full frame to a cropped frame.
    ///
    /// Non-positive (1D) periods are kept as they are.
    pub fn rescaled(&self, original: (usize, usize), cropped: (usize, usize)) -> Self {
        let scale = |p: i64, orig: usize, crop: usize| {
            if p <= 0 || orig == 0 {
                p
            } else {
                (p as f64 * crop as f64 / orig as f64) as i64 + 1
            }
        };
        Self {
            vertical: scale(self.vertical, original.0, cropped.0),
            horizontal: scale(self.horizontal, original.1, cropped.1),
        }
    }
}

/// Periods after the 1D fallback, plus which axes fell back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectivePeriod {
    pub vertical: i64,
    pub horizontal: i64,
    pub vertical_1d: bool,
    pub horizontal_1d: bool,
}

/// Pixel index `(i, j)` = `(row, col)` in the DC-centered spectrum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakIndex {
    pub i: i64,
    pub j: i64,
}

impl PeakIndex {
    pub const fn new(i: i64, j: i64) -> Self {
        Self { i, j }
    }
}

/// Experimental minus theoretical peak index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakError {
    pub di: i64,
    pub dj: i64,
}

impl PeakError {
    /// True when either axis deviates by more than `search_region / 2`.
    pub fn is_misplaced(&self, search_region: usize) -> bool {
        let limit = (search_region / 2) as i64;
        self.di.abs() > limit || self.dj.abs() > limit
    }
}

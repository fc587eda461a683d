//! Harmonic peaks, sub-band extraction and real-space harmonic images.
//!
//! A single 2D grating produces a lattice of diffraction orders in the
//! centered spectrum, one harmonic period apart along each axis. This
//! module locates those orders ([`peak`]), cuts the band around each
//! ([`extract`]) and inverse-transforms the 00/01/10 bands
//! ([`reconstruct`]). [`visibility`] reads fringe contrast from the same
//! peaks.
pub mod extract;
pub mod peak;
pub mod reconstruct;
pub mod types;
pub mod visibility;

pub use extract::{extract, harmonic_exists, validate_in_range, HarmonicPeak, HarmonicSubSpectrum};
pub use peak::{experimental_index, experimental_period, peak_error, theoretical_index};
pub use reconstruct::{reconstruct, HarmonicImages};
pub use types::{EffectivePeriod, HarmonicIndex, HarmonicPeriod, PeakError, PeakIndex};
pub use visibility::{first_harmonic_visibility, Visibility};

//! Physical constants and phase-to-DPC conversion.
use crate::error::Result;
use crate::image::ImageF64;
use serde::Serialize;

/// Planck constant times speed of light, eV·m.
pub const HC: f64 = 1.239_841_98e-6;

/// Wavelength in metres for a photon energy in eV.
#[inline]
pub fn wavelength(photon_energy: f64) -> f64 {
    HC / photon_energy
}

/// Physical sampling `[vertical, horizontal]` of the harmonic images.
pub fn virtual_pixel_size(
    pixel_size: [f64; 2],
    image_shape: (usize, usize),
    harmonic_shape: (usize, usize),
) -> [f64; 2] {
    [
        pixel_size[0] * image_shape.0 as f64 / harmonic_shape.0 as f64,
        pixel_size[1] * image_shape.1 as f64 / harmonic_shape.1 as f64,
    ]
}

/// DPC maps in rad/m together with their sampling.
#[derive(Clone, Debug)]
pub struct DpcMaps {
    /// Horizontal gradient, from harmonic 01.
    pub dpc01: ImageF64,
    /// Vertical gradient, from harmonic 10.
    pub dpc10: ImageF64,
    /// `[vertical, horizontal]` virtual pixel size, metres.
    pub virtual_pixel_size: [f64; 2],
}

/// Scale the differential phases to phase gradients.
pub fn phase_to_dpc(
    phase01: &ImageF64,
    phase10: &ImageF64,
    virtual_pixel_size: [f64; 2],
    distance: f64,
    photon_energy: f64,
) -> Result<DpcMaps> {
    phase01.ensure_same_shape(phase10)?;
    let k01 = -virtual_pixel_size[1] / distance / HC * photon_energy;
    let k10 = -virtual_pixel_size[0] / distance / HC * photon_energy;
    Ok(DpcMaps {
        dpc01: phase01.map(|p| p * k01),
        dpc10: phase10.map(|p| p * k10),
        virtual_pixel_size,
    })
}

/// Smallest resolvable phase-gradient length scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LengthSensitivity {
    pub metres: f64,
    pub wavelengths: f64,
}

/// `vps_v² / distance / 100`, also in units of the wavelength.
pub fn length_sensitivity(
    virtual_pixel_size: [f64; 2],
    distance: f64,
    photon_energy: f64,
) -> LengthSensitivity {
    let metres = virtual_pixel_size[0] * virtual_pixel_size[0] / distance / 100.0;
    LengthSensitivity {
        metres,
        wavelengths: metres / wavelength(photon_energy),
    }
}

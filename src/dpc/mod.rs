//! Differential phase contrast: conversion, correction and integration.
pub mod correct;
pub mod integrate;
pub mod physics;

pub use correct::{
    correct, pi_jump, remove_2nd_order, remove_linear_trend, remove_mean, CorrectionReport,
    DpcCorrectionOptions, QuadraticSurface,
};
pub use integrate::integrate_dpc;
pub use physics::{
    length_sensitivity, phase_to_dpc, virtual_pixel_size, wavelength, DpcMaps, LengthSensitivity,
    HC,
};

mod common;

use common::synthetic_image::MeshGrating;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use talbot_wavefront::analyzer::zscan::{fit_stack, measure_frame, ZScanParams};
use talbot_wavefront::diagnostics::{Level, RecordingSink};
use talbot_wavefront::dpc::wavelength;
use talbot_wavefront::error::Axis;
use talbot_wavefront::harmonics::HarmonicPeriod;
use talbot_wavefront::fit::{
    fit_pattern_period, fit_visibility, LmConfig, VisibilityFitParams, VisibilityModel,
    VisibilityParams,
};
use talbot_wavefront::{Error, ExperimentParams, GratingPattern};

const ENERGY: f64 = 14e3;

fn truth() -> VisibilityParams {
    VisibilityParams {
        amplitude: 0.6,
        pattern_period: 2.4e-6,
        source_sigma: 1.2e-6,
        source_distance: 1.5,
        z0: 1e-3,
    }
}

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn noisy_scan(noise: f64) -> (Vec<f64>, Vec<f64>) {
    let model = VisibilityModel {
        wavelength: wavelength(ENERGY),
    };
    let p = truth();
    let mut rng = StdRng::seed_from_u64(7);
    let z: Vec<f64> = (0..400).map(|k| 0.01 + 0.39 * k as f64 / 399.0).collect();
    let contrast = z
        .iter()
        .map(|&z| model.value(z, &p) + noise * gaussian(&mut rng))
        .collect();
    (z, contrast)
}

fn fit_params() -> VisibilityFitParams {
    VisibilityFitParams {
        pattern_period: truth().pattern_period,
        pattern_period_fixed: true,
        source_distance: 1.4,
        source_distance_fixed: false,
        source_distance_bounds: [0.5, 5.0],
        initial_amplitude: 1.0,
        initial_source_sigma: 1e-6,
        ..VisibilityFitParams::default()
    }
}

#[test]
fn visibility_fit_recovers_source_size() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (z, contrast) = noisy_scan(0.005);
    let fit = fit_visibility(&z, &contrast, ENERGY, &fit_params()).expect("fit converges");

    let t = truth();
    let rel = |a: f64, b: f64| ((a - b) / b).abs();
    assert!(
        rel(fit.source_size, t.source_sigma) < 0.05,
        "source size {:.4e} vs {:.4e}",
        fit.source_size,
        t.source_sigma
    );
    assert!(
        rel(fit.params.source_distance, t.source_distance) < 0.05,
        "source distance {:.4} vs {:.4}",
        fit.params.source_distance,
        t.source_distance
    );
    // fixed parameter stays inside its 1e-9 band
    assert!(rel(fit.params.pattern_period, t.pattern_period) < 1e-8);

    let model = VisibilityModel {
        wavelength: wavelength(ENERGY),
    };
    let expected_csi = model.coherence_length(t.source_sigma, t.source_distance);
    assert!(rel(fit.coherence_length, expected_csi) < 0.1);
    assert_eq!(fit.curve.len(), z.len());
    assert!(fit
        .curve
        .iter()
        .zip(&fit.envelope)
        .all(|(c, e)| *c <= *e + 1e-15));
}

#[test]
fn z_range_restricts_fitted_samples() {
    let (z, contrast) = noisy_scan(0.0);
    let params = VisibilityFitParams {
        z_range: Some([0.1, 0.3]),
        ..fit_params()
    };
    let fit = fit_visibility(&z, &contrast, ENERGY, &params).expect("fit converges");
    assert!(fit.z.iter().all(|&z| (0.1..=0.3).contains(&z)));
    assert_eq!(fit.z.len(), fit.contrast.len());
}

#[test]
fn inverted_period_bounds_are_rejected() {
    let (z, contrast) = noisy_scan(0.0);
    let params = VisibilityFitParams {
        pattern_period_fixed: false,
        pattern_period_bounds: [5e-6, 1e-6],
        ..fit_params()
    };
    let err = fit_visibility(&z, &contrast, ENERGY, &params).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidBounds {
            parameter: "pattern_period",
            ..
        }
    ));
}

#[test]
fn iteration_cap_reports_non_convergence() {
    let (z, contrast) = noisy_scan(0.005);
    let params = VisibilityFitParams {
        lm: LmConfig {
            max_iterations: 1,
            ..LmConfig::default()
        },
        ..fit_params()
    };
    let err = fit_visibility(&z, &contrast, ENERGY, &params).unwrap_err();
    assert!(matches!(err, Error::FitNonConvergence { iterations: 1, .. }));
}

#[test]
fn pattern_period_seed_from_period_scan() {
    let (p0, r) = (2.4e-6, 1.5);
    let z: Vec<f64> = (0..10).map(|k| 0.05 * k as f64).collect();
    let period: Vec<f64> = z.iter().map(|z| p0 * (1.0 + z / r)).collect();
    let fit = fit_pattern_period(&z, &period).expect("linear fit");
    assert!((fit.pattern_period - p0).abs() < 1e-12);
    assert!((fit.source_distance - r).abs() < 1e-6);
}

#[test]
fn image_stack_recovers_period_and_source_size() {
    let _ = env_logger::builder().is_test(true).try_init();
    // 256 px frames, 1 µm pixels: c fringes give a 256/c µm pattern period,
    // which lies on p0 (1 + z/R) with p0 = 8 µm, R = 1 m at z = 32/c - 1
    let scan = VisibilityParams {
        amplitude: 0.8,
        pattern_period: 8e-6,
        source_sigma: 5e-6,
        source_distance: 1.0,
        z0: 0.0,
    };
    let model = VisibilityModel {
        wavelength: wavelength(ENERGY),
    };
    let params = ZScanParams {
        experiment: ExperimentParams {
            pixel_size: [1e-6, 1e-6],
            grating_period: 16e-6,
            pattern: GratingPattern::EdgePi,
            source_distance: scan.source_distance,
            photon_energy: ENERGY,
            ..Default::default()
        },
        search_region: 3,
        ..Default::default()
    };

    let mut sink = RecordingSink::new();
    let mut frames = Vec::new();
    for cycles in 20..32usize {
        let z = scan.source_distance * (32.0 / cycles as f64 - 1.0);
        let contrast = model.value(z, &scan);
        let image = MeshGrating {
            contrast,
            ..MeshGrating::square(256, cycles)
        }
        .render();
        let frame = measure_frame(&image, z, &params, &mut sink).expect("frame analysis");
        let period = cycles as i64;
        assert_eq!(frame.harmonic_period, HarmonicPeriod::new(period, period));
        assert!((frame.visibility.horizontal - contrast).abs() < 1e-9);
        assert!((frame.visibility.vertical - contrast).abs() < 1e-9);
        frames.push(frame);
    }

    let fit = VisibilityFitParams {
        initial_amplitude: 1.0,
        initial_source_sigma: 3e-6,
        ..VisibilityFitParams::default()
    };
    let axes = fit_stack(&frames, ENERGY, &params, &fit, &mut sink).expect("stack fit");
    assert_eq!(axes.len(), 2);
    assert_eq!(axes[0].axis, Axis::Vertical);
    assert_eq!(axes[1].axis, Axis::Horizontal);
    assert_eq!(sink.count(Level::Warning), 0);

    let rel = |a: f64, b: f64| ((a - b) / b).abs();
    for axis in &axes {
        let seed = axis.period_fit.expect("period varies with z");
        assert!(rel(seed.pattern_period, scan.pattern_period) < 1e-9);
        assert!(rel(seed.source_distance, scan.source_distance) < 1e-6);
        assert!(
            rel(axis.visibility.source_size, scan.source_sigma) < 1e-3,
            "{} source size {:.4e}",
            axis.axis,
            axis.visibility.source_size
        );
        assert_eq!(axis.visibility.z.len(), frames.len());
    }
}

//! Frankot-Chellappa integration of the two DPC maps into a phase map.
use crate::error::{Error, Result};
use crate::image::ImageF64;
use crate::spectral::fft2;
use num_complex::Complex64;
use rustfft::FftDirection;
use std::f64::consts::PI;

/// Angular frequency of FFT bin `k` of `n` samples spaced `d` apart.
fn angular_frequency(k: usize, n: usize, d: f64) -> f64 {
    let signed = if k < n.div_ceil(2) {
        k as f64
    } else {
        k as f64 - n as f64
    };
    2.0 * PI * signed / (n as f64 * d)
}

/// Integrate `∂φ/∂x = dpc01`, `∂φ/∂y = dpc10` (rad/m) in the least-squares
/// sense. Both maps are mirror-extended to `2h × 2w` with the gradient sign
/// flipped on the mirrored axis; non-finite gradients count as zero. The
/// returned phase has its minimum at zero.
pub fn integrate_dpc(
    dpc01: &ImageF64,
    dpc10: &ImageF64,
    virtual_pixel_size: [f64; 2],
) -> Result<ImageF64> {
    dpc01.ensure_same_shape(dpc10)?;
    if dpc01.is_empty() {
        return Err(Error::EmptyInput("DPC maps for integration"));
    }
    let (h, w) = dpc01.shape();
    let (h2, w2) = (2 * h, 2 * w);
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };

    let mut gx = vec![Complex64::default(); h2 * w2];
    let mut gy = vec![Complex64::default(); h2 * w2];
    for y in 0..h2 {
        let (sy, flip_y) = if y < h { (y, false) } else { (h2 - 1 - y, true) };
        for x in 0..w2 {
            let (sx, flip_x) = if x < w { (x, false) } else { (w2 - 1 - x, true) };
            let vx = finite(dpc01.get(sx, sy));
            let vy = finite(dpc10.get(sx, sy));
            gx[y * w2 + x] = Complex64::new(if flip_x { -vx } else { vx }, 0.0);
            gy[y * w2 + x] = Complex64::new(if flip_y { -vy } else { vy }, 0.0);
        }
    }
    fft2(&mut gx, w2, h2, FftDirection::Forward);
    fft2(&mut gy, w2, h2, FftDirection::Forward);

    let i = Complex64::new(0.0, 1.0);
    let mut phi = vec![Complex64::default(); h2 * w2];
    for ky in 0..h2 {
        let wy = angular_frequency(ky, h2, virtual_pixel_size[0]);
        for kx in 0..w2 {
            let wx = angular_frequency(kx, w2, virtual_pixel_size[1]);
            let denom = wx * wx + wy * wy;
            let k = ky * w2 + kx;
            if denom > 0.0 {
                phi[k] = -i * (gx[k] * wx + gy[k] * wy) / denom;
            }
        }
    }
    fft2(&mut phi, w2, h2, FftDirection::Inverse);

    let mut out = ImageF64::from_fn(w, h, |x, y| phi[y * w2 + x].re);
    if let Some(min) = out.finite_min() {
        out.offset(-min);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_gaussian_bump() {
        let (w, h, ps) = (64usize, 48usize, 1e-6);
        let (cx, cy, s) = (30.0, 22.0, 5.0);
        let g = |x: f64, y: f64| (-((x - cx).powi(2) + (y - cy).powi(2)) / (2.0 * s * s)).exp();
        let truth = ImageF64::from_fn(w, h, |x, y| g(x as f64, y as f64));
        // gradients per metre
        let dx = ImageF64::from_fn(w, h, |x, y| {
            -(x as f64 - cx) / (s * s) * g(x as f64, y as f64) / ps
        });
        let dy = ImageF64::from_fn(w, h, |x, y| {
            -(y as f64 - cy) / (s * s) * g(x as f64, y as f64) / ps
        });
        let phase = integrate_dpc(&dx, &dy, [ps, ps]).unwrap();
        assert_eq!(phase.finite_min(), Some(0.0));
        let truth_min = truth.finite_min().unwrap();
        let err = phase
            .data
            .iter()
            .zip(&truth.data)
            .map(|(p, t)| (p - (t - truth_min)).abs())
            .fold(0.0, f64::max);
        assert!(err < 0.05, "max error {err}");
    }

    #[test]
    fn zero_gradient_gives_flat_phase() {
        let z = ImageF64::new(9, 7);
        let phase = integrate_dpc(&z, &z, [1e-6, 1e-6]).unwrap();
        assert!(phase.data.iter().all(|v| v.abs() < 1e-12));
    }
}

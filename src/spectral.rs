//! Centered 2D Fourier transform with orthonormal scaling.
//!
//! `forward` applies a row/column FFT scaled by `1/sqrt(rows*cols)` and then
//! shifts the zero frequency to index `(rows/2, cols/2)`. `inverse` undoes the
//! shift and applies the inverse FFT with the same scaling, so the pair is an
//! exact round trip up to round-off. Both are pure functions of their input.
use crate::image::{Image, ImageC64};
use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

/// Forward transform of a real or complex image, DC at `(rows/2, cols/2)`.
pub fn forward<T>(image: &Image<T>) -> ImageC64
where
    T: Copy + Into<Complex64>,
{
    let mut data: Vec<Complex64> = image.data.iter().map(|&v| v.into()).collect();
    fft2(&mut data, image.w, image.h, FftDirection::Forward);
    fftshift(&data, image.w, image.h)
}

/// Inverse of [`forward`]: undo the centering shift, then inverse FFT.
pub fn inverse(spectrum: &ImageC64) -> ImageC64 {
    let mut shifted = ifftshift(&spectrum.data, spectrum.w, spectrum.h);
    fft2(&mut shifted.data, spectrum.w, spectrum.h, FftDirection::Inverse);
    shifted
}

/// Uncentered orthonormal 2D FFT in place (row-major, `w` columns, `h` rows).
pub(crate) fn fft2(data: &mut [Complex64], w: usize, h: usize, direction: FftDirection) {
    if w == 0 || h == 0 {
        return;
    }
    let mut planner = FftPlanner::<f64>::new();

    let row_fft = planner.plan_fft(w, direction);
    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let col_fft = planner.plan_fft(h, direction);
    let mut column = vec![Complex64::default(); h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = data[y * w + x];
        }
        col_fft.process(&mut column);
        for (y, c) in column.iter().enumerate() {
            data[y * w + x] = *c;
        }
    }

    let scale = 1.0 / ((w * h) as f64).sqrt();
    for v in data.iter_mut() {
        *v *= scale;
    }
}

/// Move index `k` to `(k + n/2) mod n` along both axes.
fn fftshift(data: &[Complex64], w: usize, h: usize) -> ImageC64 {
    let mut out = Image::new(w, h);
    for y in 0..h {
        let ys = (y + h / 2) % h;
        for x in 0..w {
            let xs = (x + w / 2) % w;
            out.data[ys * w + xs] = data[y * w + x];
        }
    }
    out
}

/// Exact inverse of [`fftshift`], also for odd sizes.
fn ifftshift(data: &[Complex64], w: usize, h: usize) -> ImageC64 {
    let mut out = Image::new(w, h);
    for y in 0..h {
        let ys = (y + h / 2) % h;
        for x in 0..w {
            let xs = (x + w / 2) % w;
            out.data[y * w + x] = data[ys * w + xs];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageF64;

    fn max_abs_diff(a: &ImageC64, b: &ImageC64) -> f64 {
        a.data
            .iter()
            .zip(b.data.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn round_trip_real_odd_and_even_sizes() {
        for &(w, h) in &[(16usize, 8usize), (15, 9), (7, 12)] {
            let img = ImageF64::from_fn(w, h, |x, y| ((x * 7 + y * 13) % 11) as f64 - 3.5);
            let back = inverse(&forward(&img));
            let diff = max_abs_diff(&back, &img.to_complex());
            assert!(diff < 1e-10, "round trip error {diff} for {w}x{h}");
        }
    }

    #[test]
    fn round_trip_complex() {
        let img = ImageC64::from_fn(10, 6, |x, y| {
            Complex64::new((x as f64).sin(), (y as f64 * 0.3).cos())
        });
        let back = inverse(&forward(&img));
        assert!(max_abs_diff(&back, &img) < 1e-10);
    }

    #[test]
    fn dc_term_is_centered_and_orthonormal() {
        let (w, h) = (8usize, 6usize);
        let img = ImageF64::filled(w, h, 2.0);
        let spec = forward(&img);
        let dc = spec.get(w / 2, h / 2);
        assert!((dc.re - 2.0 * ((w * h) as f64).sqrt()).abs() < 1e-10);
        let off_dc: f64 = spec
            .data
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != (h / 2) * w + w / 2)
            .map(|(_, c)| c.norm())
            .sum();
        assert!(off_dc < 1e-10);
    }

    #[test]
    fn shift_pair_is_inverse_for_odd_sizes() {
        let (w, h) = (5usize, 3usize);
        let data: Vec<Complex64> = (0..w * h).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let shifted = fftshift(&data, w, h);
        let back = ifftshift(&shifted.data, w, h);
        assert_eq!(back.data, data);
    }
}

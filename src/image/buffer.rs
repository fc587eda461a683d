//! Owned 2D sample buffer in row-major layout (stride == width).
//!
//! Used for detector frames (`f64`), spectra and harmonic images
//! (`Complex64`) and every derived map. Pixel `(x, y)` is column `x`, row
//! `y`; spectral peak indices `(i, j)` are `(row, col)`.
use super::traits::ImageView;
use crate::error::{Error, Result};
use num_complex::Complex64;

#[derive(Clone, Debug, PartialEq)]
pub struct Image<T> {
    /// Image width in pixels (number of columns)
    pub w: usize,
    /// Image height in pixels (number of rows)
    pub h: usize,
    /// Backing storage in row-major order
    pub data: Vec<T>,
}

/// Real-valued map (frames, intensities, phases, DPC).
pub type ImageF64 = Image<f64>;
/// Complex-valued map (spectra, harmonic images).
pub type ImageC64 = Image<Complex64>;

impl<T: Copy + Default> Image<T> {
    /// Construct a default-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![T::default(); w * h],
        }
    }
}

impl<T: Copy> Image<T> {
    /// Wrap an existing row-major buffer; fails when the length is not `w*h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != w * h {
            return Err(Error::ShapeMismatch {
                expected: (h, w),
                actual: (data.len() / w.max(1), w),
            });
        }
        Ok(Self { w, h, data })
    }

    /// Build an image by evaluating `f(x, y)` on every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    /// Filled with a constant value.
    pub fn filled(w: usize, h: usize, value: T) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    /// `(rows, cols)`, matching the spectral index convention.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.h, self.w)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Element-wise map into a new image.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Image<U> {
        Image {
            w: self.w,
            h: self.h,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Element-wise combination of two same-shaped images.
    pub fn zip_map<U: Copy, V: Copy>(
        &self,
        other: &Image<U>,
        f: impl Fn(T, U) -> V,
    ) -> Result<Image<V>> {
        self.ensure_same_shape(other)?;
        Ok(Image {
            w: self.w,
            h: self.h,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn ensure_same_shape<U>(&self, other: &Image<U>) -> Result<()> {
        if self.w != other.w || self.h != other.h {
            return Err(Error::ShapeMismatch {
                expected: (self.h, self.w),
                actual: (other.h, other.w),
            });
        }
        Ok(())
    }

    /// Copy of rows `r0..r1` and columns `c0..c1`.
    pub fn crop(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> Result<Self> {
        if r0 >= r1 || c0 >= c1 || r1 > self.h || c1 > self.w {
            return Err(Error::Config(format!(
                "crop [{r0}, {r1}, {c0}, {c1}] is outside a {}x{} image",
                self.h, self.w
            )));
        }
        let mut data = Vec::with_capacity((r1 - r0) * (c1 - c0));
        for y in r0..r1 {
            data.extend_from_slice(&self.row(y)[c0..c1]);
        }
        Ok(Self {
            w: c1 - c0,
            h: r1 - r0,
            data,
        })
    }

    /// Row `y` as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    /// Column `x` gathered into a new vector.
    pub fn column(&self, x: usize) -> Vec<T> {
        (0..self.h).map(|y| self.get(x, y)).collect()
    }
}

impl ImageF64 {
    /// Mean over finite pixels; `None` when no pixel is finite.
    pub fn finite_mean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn all_non_finite(&self) -> bool {
        self.data.iter().all(|v| !v.is_finite())
    }

    /// Minimum over finite pixels.
    pub fn finite_min(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::min)
    }

    /// Add a scalar to every pixel in place.
    pub fn offset(&mut self, delta: f64) {
        for v in &mut self.data {
            *v += delta;
        }
    }

    /// Dark level estimated from the top-left `size × size` corner, clamped
    /// to the image extent, truncated to whole counts. `None` when the corner
    /// is empty or holds no finite pixel.
    pub fn corner_dark_level(&self, size: usize) -> Option<f64> {
        let rows = size.min(self.h);
        let cols = size.min(self.w);
        if rows == 0 || cols == 0 {
            return None;
        }
        let (sum, count) = (0..rows)
            .flat_map(|y| self.row(y)[..cols].iter())
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
        (count > 0).then(|| (sum / count as f64).trunc())
    }

    pub fn to_complex(&self) -> ImageC64 {
        self.map(|v| Complex64::new(v, 0.0))
    }
}

impl ImageC64 {
    /// True when every sample is non-finite (a non-existing harmonic band).
    pub fn all_non_finite(&self) -> bool {
        self.data.iter().all(|c| !c.re.is_finite() || !c.im.is_finite())
    }

    pub fn norm(&self) -> ImageF64 {
        self.map(|c| c.norm())
    }

    pub fn arg(&self) -> ImageF64 {
        self.map(|c| c.arg())
    }
}

impl<T: Copy> ImageView for Image<T> {
    type Pixel = T;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[T] {
        Image::row(self, y)
    }
    #[inline]
    fn as_slice(&self) -> &[T] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_copies_requested_window() {
        let img = ImageF64::from_fn(6, 4, |x, y| (y * 10 + x) as f64);
        let c = img.crop(1, 3, 2, 5).unwrap();
        assert_eq!(c.shape(), (2, 3));
        assert_eq!(c.row(0), &[12.0, 13.0, 14.0]);
        assert_eq!(c.row(1), &[22.0, 23.0, 24.0]);
    }

    #[test]
    fn crop_rejects_out_of_bounds_window() {
        let img = ImageF64::new(4, 4);
        assert!(img.crop(0, 5, 0, 2).is_err());
        assert!(img.crop(2, 2, 0, 2).is_err());
    }

    #[test]
    fn finite_mean_skips_nan() {
        let img = ImageF64::from_vec(2, 2, vec![1.0, f64::NAN, 3.0, f64::INFINITY]).unwrap();
        assert_eq!(img.finite_mean(), Some(2.0));
        assert_eq!(ImageF64::filled(2, 2, f64::NAN).finite_mean(), None);
    }

    #[test]
    fn corner_dark_level_uses_top_left_block() {
        // 150 x 120 frame: 100 x 100 corner at 10.5, the rest bright
        let img = ImageF64::from_fn(150, 120, |x, y| {
            if x < 100 && y < 100 {
                10.5
            } else {
                1e3
            }
        });
        assert_eq!(img.corner_dark_level(100), Some(10.0));
    }

    #[test]
    fn corner_dark_level_clamps_to_small_frames() {
        let img = ImageF64::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(img.corner_dark_level(100), Some(2.0));
        assert_eq!(img.corner_dark_level(0), None);
        assert_eq!(ImageF64::new(0, 0).corner_dark_level(100), None);
    }

    #[test]
    fn zip_map_checks_shape() {
        let a = ImageF64::new(3, 2);
        let b = ImageF64::new(2, 3);
        assert!(matches!(
            a.zip_map(&b, |x, y| x + y),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}

use std::f64::consts::PI;
use talbot_wavefront::image::ImageF64;

/// Cosine mesh standing in for the Talbot pattern of a 2D grating.
///
/// `cycles` counts fringes across the frame along each axis (vertical,
/// horizontal); `extra` adds whole cycles to the horizontal fringes only,
/// which shows up as a linear 01 phase ramp. A zero cycle count drops that
/// axis (1D grating).
#[derive(Clone, Copy, Debug)]
pub struct MeshGrating {
    pub width: usize,
    pub height: usize,
    pub cycles: (usize, usize),
    pub extra: usize,
    pub contrast: f64,
}

impl MeshGrating {
    pub fn square(size: usize, cycles: usize) -> Self {
        Self {
            width: size,
            height: size,
            cycles: (cycles, cycles),
            extra: 0,
            contrast: 0.5,
        }
    }

    pub fn render(&self) -> ImageF64 {
        assert!(self.width > 0 && self.height > 0, "image dimensions must be positive");
        let (cv, ch) = self.cycles;
        let kx = 2.0 * PI * (ch + self.extra) as f64 / self.width as f64;
        let ky = 2.0 * PI * cv as f64 / self.height as f64;
        ImageF64::from_fn(self.width, self.height, |x, y| {
            let mut v = 1.0;
            if ch > 0 {
                v += self.contrast * (kx * x as f64).cos();
            }
            if cv > 0 {
                v += self.contrast * (ky * y as f64).cos();
            }
            v
        })
    }
}

/// Mean of the wrapped pixel-to-pixel phase difference along rows.
pub fn mean_row_step(phase: &ImageF64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..phase.h {
        for pair in phase.row(y).windows(2) {
            let d = pair[1] - pair[0];
            if d.is_finite() {
                sum += d.sin().atan2(d.cos());
                count += 1;
            }
        }
    }
    sum / count as f64
}

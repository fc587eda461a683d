//! 2D phase unwrapping by reliability-sorted edge merging.
//!
//! Each pixel gets a reliability from the wrapped second differences of its
//! 8-neighbourhood (border pixels get zero). Edges between 4-neighbours are
//! visited from the most to the least reliable; every edge joining two
//! groups shifts the smaller group by the multiple of `2π` that makes the
//! pair continuous. Ties are broken by a seeded random key so the output is
//! reproducible. Non-finite pixels stay non-finite and never join a group.
use crate::image::ImageF64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub const DEFAULT_SEED: u64 = 72673;

const TWO_PI: f64 = 2.0 * PI;

#[inline]
fn wrap(x: f64) -> f64 {
    x - TWO_PI * (x / TWO_PI).round()
}

struct Edge {
    reliability: f64,
    key: u64,
    a: usize,
    b: usize,
}

/// Unwrap `wrapped` with the default seed.
pub fn unwrap_phase(wrapped: &ImageF64) -> ImageF64 {
    unwrap_phase_seeded(wrapped, DEFAULT_SEED)
}

pub fn unwrap_phase_seeded(wrapped: &ImageF64, seed: u64) -> ImageF64 {
    let (w, h) = (wrapped.w, wrapped.h);
    let n = w * h;
    if n == 0 {
        return wrapped.clone();
    }
    let reliability = pixel_reliability(wrapped);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(2 * n);
    for y in 0..h {
        for x in 0..w {
            let a = y * w + x;
            if !wrapped.data[a].is_finite() {
                continue;
            }
            let mut push = |b: usize| {
                if wrapped.data[b].is_finite() {
                    edges.push(Edge {
                        reliability: reliability[a] + reliability[b],
                        key: rng.gen(),
                        a,
                        b,
                    });
                }
            };
            if x + 1 < w {
                push(a + 1);
            }
            if y + 1 < h {
                push(a + w);
            }
        }
    }
    edges.sort_by(|l, r| {
        r.reliability
            .total_cmp(&l.reliability)
            .then(l.key.cmp(&r.key))
    });

    let mut out = wrapped.data.clone();
    let mut group_of: Vec<usize> = (0..n).collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for edge in &edges {
        let (ga, gb) = (group_of[edge.a], group_of[edge.b]);
        if ga == gb {
            continue;
        }
        let k = ((out[edge.a] - out[edge.b]) / TWO_PI).round();
        // shift the smaller group onto the larger one
        let (keep, moved, shift) = if members[ga].len() >= members[gb].len() {
            (ga, gb, k * TWO_PI)
        } else {
            (gb, ga, -k * TWO_PI)
        };
        let moved_members = std::mem::take(&mut members[moved]);
        for &p in &moved_members {
            out[p] += shift;
            group_of[p] = keep;
        }
        members[keep].extend(moved_members);
    }

    ImageF64 {
        w,
        h,
        data: out,
    }
}

/// `1/D` with `D² = H² + V² + D1² + D2²` over wrapped second differences.
fn pixel_reliability(phase: &ImageF64) -> Vec<f64> {
    let (w, h) = (phase.w, phase.h);
    let mut rel = vec![0.0; w * h];
    if w < 3 || h < 3 {
        return rel;
    }
    let at = |x: usize, y: usize| phase.data[y * w + x];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = at(x, y);
            let second = |p: f64, q: f64| wrap(p - c) - wrap(c - q);
            let hd = second(at(x - 1, y), at(x + 1, y));
            let vd = second(at(x, y - 1), at(x, y + 1));
            let d1 = second(at(x - 1, y - 1), at(x + 1, y + 1));
            let d2 = second(at(x + 1, y - 1), at(x - 1, y + 1));
            let d = (hd * hd + vd * vd + d1 * d1 + d2 * d2).sqrt();
            rel[y * w + x] = if !d.is_finite() {
                0.0
            } else if d == 0.0 {
                f64::MAX
            } else {
                1.0 / d
            };
        }
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize, sx: f64, sy: f64) -> ImageF64 {
        ImageF64::from_fn(w, h, |x, y| sx * x as f64 + sy * y as f64)
    }

    fn assert_matches_up_to_constant(a: &ImageF64, b: &ImageF64) {
        let offset = a.data[0] - b.data[0];
        assert!((offset / TWO_PI - (offset / TWO_PI).round()).abs() < 1e-9);
        for (p, q) in a.data.iter().zip(&b.data) {
            if p.is_finite() {
                assert!((p - q - offset).abs() < 1e-9, "{p} vs {q}");
            } else {
                assert!(!q.is_finite());
            }
        }
    }

    #[test]
    fn unwraps_tilted_plane() {
        let truth = ramp(40, 30, 0.7, -0.45);
        let wrapped = truth.map(wrap);
        let out = unwrap_phase(&wrapped);
        assert_matches_up_to_constant(&out, &truth);
    }

    #[test]
    fn keeps_nan_pixels_and_unwraps_around_them() {
        let truth = ramp(32, 32, 0.9, 0.3);
        let mut wrapped = truth.map(wrap);
        let mut expected = truth.clone();
        for y in 10..14 {
            for x in 12..18 {
                wrapped.set(x, y, f64::NAN);
                expected.set(x, y, f64::NAN);
            }
        }
        let out = unwrap_phase(&wrapped);
        assert_matches_up_to_constant(&out, &expected);
    }

    #[test]
    fn same_seed_same_result() {
        let wrapped = ramp(25, 17, 1.3, 0.8).map(wrap);
        assert_eq!(unwrap_phase(&wrapped), unwrap_phase(&wrapped));
    }

    #[test]
    fn unwrapped_input_is_untouched_up_to_constant() {
        let flat = ImageF64::from_fn(8, 8, |x, y| 0.01 * (x + y) as f64);
        let out = unwrap_phase(&flat);
        assert_matches_up_to_constant(&out, &flat);
    }
}

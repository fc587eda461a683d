//! First-order least-squares fits.
use crate::error::{Error, Result};
use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

/// `y = slope * x + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through the finite `(x, y)` pairs.
///
/// Pairs where either value is non-finite are skipped. Fewer than two
/// usable points is [`Error::EmptyInput`]; all-equal abscissae is
/// [`Error::SingularFit`].
pub fn polyfit1(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(Error::ShapeMismatch {
            expected: (xs.len(), 1),
            actual: (ys.len(), 1),
        });
    }
    let mut ata = Matrix2::<f64>::zeros();
    let mut atb = Vector2::<f64>::zeros();
    // centred abscissae
    let finite = || xs.iter().zip(ys).filter(|(x, y)| x.is_finite() && y.is_finite());
    let n_finite = finite().count();
    if n_finite < 2 {
        return Err(Error::EmptyInput("fewer than two finite points for a linear fit"));
    }
    let x_mean = finite().map(|(x, _)| *x).sum::<f64>() / n_finite as f64;
    for (&x, &y) in finite() {
        let xc = x - x_mean;
        ata[(0, 0)] += xc * xc;
        ata[(0, 1)] += xc;
        ata[(1, 1)] += 1.0;
        atb[0] += xc * y;
        atb[1] += y;
    }
    ata[(1, 0)] = ata[(0, 1)];
    if ata[(0, 0)] == 0.0 {
        return Err(Error::SingularFit("abscissae are all equal"));
    }
    let sol = ata
        .lu()
        .solve(&atb)
        .ok_or(Error::SingularFit("linear normal equations"))?;
    Ok(LinearFit {
        slope: sol[0],
        intercept: sol[1] - sol[0] * x_mean,
    })
}

/// Linear dependence of the pattern period on the detector distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PatternPeriodFit {
    pub slope: f64,
    pub intercept: f64,
    /// `intercept / slope`
    pub source_distance: f64,
    /// period at `z = 0`
    pub pattern_period: f64,
}

/// Fit `period(z) = p0 + p0/R · z`; `R` is the source distance.
pub fn fit_pattern_period(z: &[f64], period: &[f64]) -> Result<PatternPeriodFit> {
    let fit = polyfit1(z, period)?;
    let mut finite = z
        .iter()
        .zip(period)
        .filter(|(z, p)| z.is_finite() && p.is_finite())
        .map(|(_, p)| *p);
    let constant = finite
        .next()
        .is_some_and(|first| finite.all(|p| p == first));
    if constant || fit.slope == 0.0 {
        return Err(Error::SingularFit("pattern period does not change with distance"));
    }
    Ok(PatternPeriodFit {
        slope: fit.slope,
        intercept: fit.intercept,
        source_distance: fit.intercept / fit.slope,
        pattern_period: fit.intercept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.5 * x - 1.0).collect();
        let fit = polyfit1(&xs, &ys).unwrap();
        assert!((fit.slope - 2.5).abs() < 1e-12);
        assert!((fit.intercept + 1.0).abs() < 1e-12);
        assert!((fit.eval(10.0) - 24.0).abs() < 1e-10);
    }

    #[test]
    fn skips_non_finite_points() {
        let xs = [0.0, 1.0, f64::NAN, 3.0, 4.0];
        let ys = [1.0, 3.0, 100.0, f64::INFINITY, 9.0];
        let fit = polyfit1(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(matches!(polyfit1(&[1.0], &[2.0]), Err(Error::EmptyInput(_))));
        assert!(matches!(
            polyfit1(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(Error::SingularFit(_))
        ));
    }

    #[test]
    fn constant_pattern_period_is_singular() {
        let z = [0.1, 0.2, 0.3, 0.4];
        assert!(matches!(
            fit_pattern_period(&z, &[8e-6; 4]),
            Err(Error::SingularFit(_))
        ));
    }

    #[test]
    fn pattern_period_gives_source_distance() {
        let (p0, r) = (4.8e-6, 32.0);
        let z = [0.1, 0.2, 0.3, 0.5];
        let period: Vec<f64> = z.iter().map(|z| p0 * (1.0 + z / r)).collect();
        let fit = fit_pattern_period(&z, &period).unwrap();
        assert!((fit.source_distance - r).abs() / r < 1e-8);
        assert!((fit.pattern_period - p0).abs() / p0 < 1e-10);
    }
}

//! Bounded Levenberg-Marquardt for small 1D models.
//!
//! Parameters are optimized in normalized coordinates `u = (p - lo)/(hi - lo)`
//! clamped to `[0, 1]`, with a central-difference Jacobian. A parameter whose
//! bound band is vanishingly narrow is held fixed.
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Optimizer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    pub max_iterations: usize,
    /// Stop when the largest normalized parameter step is below this.
    pub xtol: f64,
    /// Stop when the relative χ² decrease is below this.
    pub ftol: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            xtol: 1e-10,
            ftol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LmResult<const N: usize> {
    pub params: [f64; N],
    pub chi2: f64,
    pub iterations: usize,
}

/// Model `y = f(x; params)` fitted by [`optimize`].
pub trait LmModel<const N: usize> {
    fn evaluate(&self, x: f64, params: &[f64; N]) -> f64;

    /// Name used in bound errors.
    fn parameter_name(&self, _index: usize) -> &'static str {
        "parameter"
    }
}

const LAMBDA_MAX: f64 = 1e16;
const FIXED_WIDTH: f64 = 1e-8;
const JACOBIAN_STEP: f64 = 1e-7;

struct Normalizer<const N: usize> {
    lower: [f64; N],
    width: [f64; N],
    fixed: [bool; N],
}

impl<const N: usize> Normalizer<N> {
    fn to_params(&self, u: &[f64; N]) -> [f64; N] {
        let mut p = [0.0; N];
        for k in 0..N {
            p[k] = self.lower[k] + u[k] * self.width[k];
        }
        p
    }
}

fn chi2<const N: usize, M: LmModel<N>>(model: &M, xs: &[f64], ys: &[f64], p: &[f64; N]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - model.evaluate(x, p);
            r * r
        })
        .sum()
}

/// Minimize `Σ (y - f(x))²` with `lower <= params <= upper`.
///
/// Returns [`Error::InvalidBounds`] when any `lower >= upper` and
/// [`Error::FitNonConvergence`] when no convergence criterion is met within
/// `max_iterations` or χ² becomes non-finite.
pub fn optimize<const N: usize, M: LmModel<N>>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    initial: [f64; N],
    lower: [f64; N],
    upper: [f64; N],
    config: &LmConfig,
) -> Result<LmResult<N>> {
    if xs.is_empty() {
        return Err(Error::EmptyInput("no samples to fit"));
    }
    if xs.len() != ys.len() {
        return Err(Error::ShapeMismatch {
            expected: (xs.len(), 1),
            actual: (ys.len(), 1),
        });
    }
    let mut width = [0.0; N];
    let mut fixed = [false; N];
    for k in 0..N {
        if lower[k].partial_cmp(&upper[k]) != Some(std::cmp::Ordering::Less) {
            return Err(Error::InvalidBounds {
                parameter: model.parameter_name(k),
                min: lower[k],
                max: upper[k],
            });
        }
        width[k] = upper[k] - lower[k];
        let scale = lower[k].abs().max(upper[k].abs());
        fixed[k] = width[k] <= FIXED_WIDTH * scale;
    }
    let norm = Normalizer {
        lower,
        width,
        fixed,
    };

    let mut u = [0.0; N];
    for k in 0..N {
        u[k] = ((initial[k] - lower[k]) / width[k]).clamp(0.0, 1.0);
    }
    let mut current = chi2(model, xs, ys, &norm.to_params(&u));
    if !current.is_finite() {
        return Err(Error::FitNonConvergence {
            iterations: 0,
            reason: "initial residual is not finite".into(),
        });
    }

    let m = xs.len();
    let mut lambda = config.initial_lambda;
    let mut jac = DMatrix::<f64>::zeros(m, N);
    let mut res = DVector::<f64>::zeros(m);

    for iter in 0..config.max_iterations {
        let p = norm.to_params(&u);
        for (row, (&x, &y)) in xs.iter().zip(ys).enumerate() {
            res[row] = y - model.evaluate(x, &p);
        }
        for k in 0..N {
            if norm.fixed[k] {
                jac.column_mut(k).fill(0.0);
                continue;
            }
            let hi = (u[k] + JACOBIAN_STEP).min(1.0);
            let lo = (u[k] - JACOBIAN_STEP).max(0.0);
            let (mut up, mut down) = (u, u);
            up[k] = hi;
            down[k] = lo;
            let (pu, pd) = (norm.to_params(&up), norm.to_params(&down));
            for (row, &x) in xs.iter().enumerate() {
                jac[(row, k)] = (model.evaluate(x, &pu) - model.evaluate(x, &pd)) / (hi - lo);
            }
        }

        let jt = jac.transpose();
        let hessian = &jt * &jac;
        let gradient = &jt * &res;
        if gradient.amax() == 0.0 {
            return Ok(LmResult {
                params: p,
                chi2: current,
                iterations: iter + 1,
            });
        }

        loop {
            let mut damped = hessian.clone();
            for k in 0..N {
                if norm.fixed[k] {
                    damped.row_mut(k).fill(0.0);
                    damped.column_mut(k).fill(0.0);
                    damped[(k, k)] = 1.0;
                } else {
                    let d = hessian[(k, k)].max(1e-12);
                    damped[(k, k)] += lambda * d;
                }
            }
            let mut rhs = gradient.clone();
            for k in 0..N {
                if norm.fixed[k] {
                    rhs[k] = 0.0;
                }
            }
            let step = damped.lu().solve(&rhs);

            let mut trial = u;
            if let Some(step) = step.as_ref() {
                for k in 0..N {
                    trial[k] = (u[k] + step[k]).clamp(0.0, 1.0);
                }
            }
            let trial_chi2 = chi2(model, xs, ys, &norm.to_params(&trial));

            if step.is_some() && trial_chi2.is_finite() && trial_chi2 < current {
                let max_step = (0..N).map(|k| (trial[k] - u[k]).abs()).fold(0.0, f64::max);
                let decrease = (current - trial_chi2) / current.max(f64::MIN_POSITIVE);
                u = trial;
                current = trial_chi2;
                lambda = (lambda * config.lambda_down).max(1e-15);
                if max_step < config.xtol || decrease < config.ftol {
                    return Ok(LmResult {
                        params: norm.to_params(&u),
                        chi2: current,
                        iterations: iter + 1,
                    });
                }
                break;
            }

            lambda *= config.lambda_up;
            if lambda > LAMBDA_MAX {
                // no damped step lowers χ²: at a (possibly bound-constrained) minimum
                return Ok(LmResult {
                    params: norm.to_params(&u),
                    chi2: current,
                    iterations: iter + 1,
                });
            }
        }
    }

    Err(Error::FitNonConvergence {
        iterations: config.max_iterations,
        reason: format!("χ² = {current:.6e} still decreasing"),
    })
}

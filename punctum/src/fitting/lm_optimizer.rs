//! Levenberg-Marquardt optimizer for least-squares profile fitting.
//!
//! Generic over the parameter count. Parameters can be held fixed through a
//! `vary` mask: the normal equations are then built over the varying subset
//! only, so a fixed parameter never moves and gets a standard error of zero.
//! Uses f64 throughout for numerical stability.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_non_negative, ensure_positive};
use crate::math::linear_solver::gauss_jordan;

/// Damping above which the optimizer gives up on finding a downhill step.
const MAX_LAMBDA: f64 = 1e10;

/// Configuration for Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum iterations.
    pub max_iterations: usize,
    /// Stop once an accepted step changes the sum of squares by less than this.
    pub precision: f64,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Lambda is multiplied by this on a failed step and divided on success.
    pub lambda_factor: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            precision: 1e-6,
            initial_lambda: 0.001,
            lambda_factor: 10.0,
        }
    }
}

impl LmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::invalid("lm.max_iterations", "must be at least 1"));
        }
        ensure_non_negative("lm.precision", self.precision)?;
        ensure_positive("lm.initial_lambda", self.initial_lambda)?;
        if !(self.lambda_factor.is_finite() && self.lambda_factor > 1.0) {
            return Err(Error::invalid(
                "lm.lambda_factor",
                format!("must be greater than 1, got {}", self.lambda_factor),
            ));
        }
        Ok(())
    }
}

/// Result of L-M optimization.
#[derive(Debug, Clone, Copy)]
pub struct LmResult<const N: usize> {
    pub params: [f64; N],
    /// Standard errors: zero for fixed parameters, NaN when unavailable.
    pub errors: [f64; N],
    /// Residual sum of squares at `params`.
    pub chi2: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Trait for models that can be fit with L-M optimization.
pub trait LmModel<const N: usize> {
    /// Evaluate the model at a point.
    fn evaluate(&self, x: f64, y: f64, params: &[f64; N]) -> f64;

    /// Compute partial derivatives at a point.
    fn jacobian_row(&self, x: f64, y: f64, params: &[f64; N]) -> [f64; N];

    /// Model value and partial derivatives in one pass.
    #[inline]
    fn evaluate_and_jacobian(&self, x: f64, y: f64, params: &[f64; N]) -> (f64, [f64; N]) {
        (self.evaluate(x, y, params), self.jacobian_row(x, y, params))
    }
}

/// Run L-M optimization over the parameters selected by `vary`.
pub fn optimize<const N: usize, M: LmModel<N>>(
    model: &M,
    data_x: &[f64],
    data_y: &[f64],
    data_z: &[f64],
    initial_params: [f64; N],
    vary: [bool; N],
    config: &LmConfig,
) -> LmResult<N> {
    let active: Vec<usize> = (0..N).filter(|&i| vary[i]).collect();
    let k = active.len();

    let mut params = initial_params;
    let mut lambda = config.initial_lambda;
    let mut prev_chi2 = compute_chi2(model, data_x, data_y, data_z, &params);
    let mut converged = false;
    let mut iterations = 0;

    if k > 0 && prev_chi2.is_finite() {
        for iter in 0..config.max_iterations {
            iterations = iter + 1;

            let (mut hessian, mut gradient) =
                build_normal_equations(model, data_x, data_y, data_z, &params, &active);
            for (i, row) in hessian.iter_mut().enumerate().take(k) {
                row[i] *= 1.0 + lambda;
            }

            if !gauss_jordan(&mut hessian, &mut gradient, k) {
                break;
            }

            let mut new_params = params;
            for (slot, &p) in active.iter().enumerate() {
                new_params[p] += gradient[slot];
            }

            let new_chi2 = compute_chi2(model, data_x, data_y, data_z, &new_params);

            if new_chi2 < prev_chi2 {
                let improvement = prev_chi2 - new_chi2;
                params = new_params;
                prev_chi2 = new_chi2;
                lambda /= config.lambda_factor;
                if improvement < config.precision {
                    converged = true;
                    break;
                }
            } else {
                lambda *= config.lambda_factor;
                if lambda > MAX_LAMBDA {
                    break;
                }
            }
        }
    }

    let errors = standard_errors(model, data_x, data_y, data_z, &params, &active, prev_chi2);

    LmResult {
        params,
        errors,
        chi2: prev_chi2,
        converged,
        iterations,
    }
}

/// `sqrt(inv(JᵀJ)_ii · SSR / (n - k))` for each varying parameter.
fn standard_errors<const N: usize, M: LmModel<N>>(
    model: &M,
    data_x: &[f64],
    data_y: &[f64],
    data_z: &[f64],
    params: &[f64; N],
    active: &[usize],
    chi2: f64,
) -> [f64; N] {
    let mut errors = [0.0f64; N];
    let k = active.len();
    if k == 0 {
        return errors;
    }

    let n = data_x.len();
    let (mut hessian, mut gradient) =
        build_normal_equations(model, data_x, data_y, data_z, params, active);
    if n <= k || !gauss_jordan(&mut hessian, &mut gradient, k) {
        for &p in active {
            errors[p] = f64::NAN;
        }
        return errors;
    }

    let residual_variance = chi2 / (n - k) as f64;
    for (slot, &p) in active.iter().enumerate() {
        errors[p] = (hessian[slot][slot] * residual_variance).sqrt();
    }
    errors
}

fn compute_chi2<const N: usize, M: LmModel<N>>(
    model: &M,
    data_x: &[f64],
    data_y: &[f64],
    data_z: &[f64],
    params: &[f64; N],
) -> f64 {
    data_x
        .iter()
        .zip(data_y.iter())
        .zip(data_z.iter())
        .map(|((&x, &y), &z)| {
            let residual = z - model.evaluate(x, y, params);
            residual * residual
        })
        .sum()
}

/// Hessian approximation (JᵀJ) and gradient (Jᵀr) over the active parameters,
/// packed into the leading `active.len()` rows and columns.
/// Exploits symmetry: only computes upper triangle, then mirrors.
#[allow(clippy::needless_range_loop)]
fn build_normal_equations<const N: usize, M: LmModel<N>>(
    model: &M,
    data_x: &[f64],
    data_y: &[f64],
    data_z: &[f64],
    params: &[f64; N],
    active: &[usize],
) -> ([[f64; N]; N], [f64; N]) {
    let k = active.len();
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for ((&x, &y), &z) in data_x.iter().zip(data_y.iter()).zip(data_z.iter()) {
        let (value, row) = model.evaluate_and_jacobian(x, y, params);
        let r = z - value;
        for i in 0..k {
            let ji = row[active[i]];
            gradient[i] += ji * r;
            for j in i..k {
                hessian[i][j] += ji * row[active[j]];
            }
        }
    }

    for i in 1..k {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

//! Symmetric 2D Gaussian on a constant baseline.
//!
//! f(x,y) = b + h × exp(-((x-x₀)² + (y-y₀)²) / 2σ²)
//!
//! Parameters: `[b, h, x0, y0, sigma]`, matching the index constants in
//! [`crate::peak`].

use super::lm_optimizer::LmModel;
use crate::peak::PARAM_COUNT;

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian2D;

impl LmModel<PARAM_COUNT> for Gaussian2D {
    #[inline]
    fn evaluate(&self, x: f64, y: f64, params: &[f64; PARAM_COUNT]) -> f64 {
        let [b, h, x0, y0, sigma] = *params;
        let dx = x - x0;
        let dy = y - y0;
        b + h * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
    }

    #[inline]
    fn jacobian_row(&self, x: f64, y: f64, params: &[f64; PARAM_COUNT]) -> [f64; PARAM_COUNT] {
        self.evaluate_and_jacobian(x, y, params).1
    }

    #[inline]
    fn evaluate_and_jacobian(
        &self,
        x: f64,
        y: f64,
        params: &[f64; PARAM_COUNT],
    ) -> (f64, [f64; PARAM_COUNT]) {
        let [b, h, x0, y0, sigma] = *params;
        let sigma2 = sigma * sigma;
        let dx = x - x0;
        let dy = y - y0;
        let r2 = dx * dx + dy * dy;
        let exp_val = (-r2 / (2.0 * sigma2)).exp();
        let h_exp = h * exp_val;

        (
            b + h_exp,
            [
                1.0,                           // df/db
                exp_val,                       // df/dh
                h_exp * dx / sigma2,           // df/dx0
                h_exp * dy / sigma2,           // df/dy0
                h_exp * r2 / (sigma2 * sigma), // df/dsigma
            ],
        )
    }
}

//! Sub-pixel refinement of peak candidates by 2D Gaussian least-squares fitting.
//!
//! A [`FitWindow`] collects the pixels around a candidate, [`PeakFitter`]
//! runs Levenberg-Marquardt on them and [`FitResult::validate`] decides
//! whether the outcome is trustworthy enough to keep the peak.


pub mod gaussian;
pub mod lm_optimizer;

use glam::DVec2;
use thiserror::Error;

use crate::math;
use crate::peak::{BASELINE, HEIGHT, PARAM_COUNT, Peak, SIGMA, X, Y};
use crate::pixel::PixelSource;

pub use gaussian::Gaussian2D;
pub use lm_optimizer::{LmConfig, LmModel, LmResult, optimize};

const PARAM_NAMES: [&str; PARAM_COUNT] = ["baseline", "height", "x", "y", "sigma"];

/// Pixels selected for one fit, as parallel coordinate/value arrays.
#[derive(Debug, Clone, Default)]
pub struct FitWindow {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub zs: Vec<f64>,
}

impl FitWindow {
    /// Square of side `2 * radius + 1` centred on the rounded position.
    ///
    /// Coordinates outside the frame keep their virtual value; the sample is
    /// taken from the mirrored pixel.
    pub fn square<S: PixelSource + ?Sized>(
        source: &S,
        t: usize,
        center: DVec2,
        radius: usize,
    ) -> Self {
        let side = 2 * radius + 1;
        let mut window = Self {
            xs: Vec::with_capacity(side * side),
            ys: Vec::with_capacity(side * side),
            zs: Vec::with_capacity(side * side),
        };
        if !center.is_finite() {
            return window;
        }

        let cx = center.x.round() as i64;
        let cy = center.y.round() as i64;
        let r = radius as i64;
        for y in (cy - r)..=(cy + r) {
            for x in (cx - r)..=(cx + r) {
                window.xs.push(x as f64);
                window.ys.push(y as f64);
                window.zs.push(source.get(x, y, t));
            }
        }
        window
    }

    /// Pixels beyond `threshold` (`> threshold`, or `< -threshold` in
    /// negative mode) that are 8-connected to the rounded centre.
    ///
    /// Unlike [`square`](Self::square) the shape follows the feature, so
    /// elongated or asymmetric spots are not truncated. `search_radius`
    /// only bounds the growth and should exceed the expected feature extent.
    /// A centre pixel that is not beyond the threshold gives an empty window.
    pub fn thresholded<S: PixelSource + ?Sized>(
        source: &S,
        t: usize,
        center: DVec2,
        search_radius: usize,
        threshold: f64,
        find_negative: bool,
    ) -> Self {
        let beyond = |v: f64| {
            if find_negative {
                v < -threshold
            } else {
                v > threshold
            }
        };
        let mut window = Self::default();
        if !center.is_finite() {
            return window;
        }

        let cx = center.x.round() as i64;
        let cy = center.y.round() as i64;
        let r = search_radius as i64;
        let side = 2 * search_radius + 1;
        let slot = |x: i64, y: i64| ((y - cy + r) as usize) * side + (x - cx + r) as usize;

        let mut accepted: Vec<Option<f64>> = vec![None; side * side];
        let mut visited = vec![false; side * side];
        let mut pending = vec![(cx, cy)];
        visited[slot(cx, cy)] = true;
        while let Some((x, y)) = pending.pop() {
            let value = source.get(x, y, t);
            if !beyond(value) {
                continue;
            }
            accepted[slot(x, y)] = Some(value);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if (nx - cx).abs() > r || (ny - cy).abs() > r {
                        continue;
                    }
                    let i = slot(nx, ny);
                    if !visited[i] {
                        visited[i] = true;
                        pending.push((nx, ny));
                    }
                }
            }
        }

        for (i, value) in accepted.into_iter().enumerate() {
            if let Some(value) = value {
                window.xs.push((cx - r + (i % side) as i64) as f64);
                window.ys.push((cy - r + (i / side) as i64) as f64);
                window.zs.push(value);
            }
        }
        window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.zs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.zs.is_empty()
    }
}

/// Why a fit was not accepted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitRejection {
    #[error("fit diverged: non-finite parameter or error")]
    Divergent,

    #[error("implausible fit: negative position or width")]
    Implausible,

    #[error("{name} error {error} exceeds {max}")]
    ErrorTooLarge {
        name: &'static str,
        error: f64,
        max: f64,
    },

    #[error("R² {r_squared} below minimum {min}")]
    LowRSquared { r_squared: f64, min: f64 },
}

/// Outcome of one Gaussian fit.
#[derive(Debug, Clone, Copy)]
pub struct FitResult {
    /// `[baseline, height, x, y, sigma]`.
    pub params: [f64; PARAM_COUNT],
    /// Standard errors in parameter order.
    pub errors: [f64; PARAM_COUNT],
    pub r_squared: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl FitResult {
    /// A result that every validation rejects, used when nothing could be fit.
    fn failed(params: [f64; PARAM_COUNT]) -> Self {
        Self {
            params,
            errors: [f64::NAN; PARAM_COUNT],
            r_squared: f64::NAN,
            iterations: 0,
            converged: false,
        }
    }

    /// Check the result against the plausibility rules and optional quality gates.
    ///
    /// Gates are applied in order: divergence, implausible geometry, per-parameter
    /// error bound, minimum R².
    pub fn validate(
        &self,
        max_error: Option<&[f64; PARAM_COUNT]>,
        min_r_squared: Option<f64>,
    ) -> Result<(), FitRejection> {
        if self.params.iter().chain(&self.errors).any(|v| !v.is_finite()) {
            return Err(FitRejection::Divergent);
        }
        if self.params[X] < 0.0 || self.params[Y] < 0.0 || self.params[SIGMA] < 0.0 {
            return Err(FitRejection::Implausible);
        }
        if let Some(max_error) = max_error {
            for ((&error, &max), name) in self.errors.iter().zip(max_error).zip(PARAM_NAMES) {
                if error > max {
                    return Err(FitRejection::ErrorTooLarge { name, error, max });
                }
            }
        }
        if let Some(min) = min_r_squared
            && (self.r_squared.is_nan() || self.r_squared < min)
        {
            return Err(FitRejection::LowRSquared {
                r_squared: self.r_squared,
                min,
            });
        }
        Ok(())
    }

    /// Copy parameters, errors and R² onto the peak.
    pub fn apply_to(&self, peak: &mut Peak) {
        peak.set_params(&self.params);
        peak.fit_errors = self.errors;
        peak.r_squared = self.r_squared;
    }
}

/// Fits the Gaussian model to a window.
#[derive(Debug, Clone)]
pub struct PeakFitter {
    pub lm: LmConfig,
    /// Parameters allowed to change, `[baseline, height, x, y, sigma]`.
    pub vary: [bool; PARAM_COUNT],
    /// Starting width used when the guess leaves sigma unset.
    pub initial_sigma: f64,
    /// Fit dips instead of bumps when auto-filling the guess.
    pub find_negative: bool,
}

impl Default for PeakFitter {
    fn default() -> Self {
        Self {
            lm: LmConfig::default(),
            vary: [true; PARAM_COUNT],
            initial_sigma: 1.0,
            find_negative: false,
        }
    }
}

impl PeakFitter {
    /// Replace NaN entries of `guess` with estimates from the window.
    ///
    /// Baseline is the window minimum and height the range (mirrored for
    /// negative mode); position is the extreme pixel and sigma the configured
    /// starting width.
    pub fn initial_guess(
        &self,
        window: &FitWindow,
        guess: [f64; PARAM_COUNT],
    ) -> [f64; PARAM_COUNT] {
        let mut params = guess;
        if window.is_empty() {
            return params;
        }

        let mut min_idx = 0;
        let mut max_idx = 0;
        for (i, &z) in window.zs.iter().enumerate() {
            if z < window.zs[min_idx] {
                min_idx = i;
            }
            if z > window.zs[max_idx] {
                max_idx = i;
            }
        }
        let min = window.zs[min_idx];
        let max = window.zs[max_idx];

        let (baseline, height, extreme) = if self.find_negative {
            (max, min - max, min_idx)
        } else {
            (min, max - min, max_idx)
        };

        let fill = |slot: &mut f64, value: f64| {
            if slot.is_nan() {
                *slot = value;
            }
        };
        fill(&mut params[BASELINE], baseline);
        fill(&mut params[HEIGHT], height);
        fill(&mut params[X], window.xs[extreme]);
        fill(&mut params[Y], window.ys[extreme]);
        fill(&mut params[SIGMA], self.initial_sigma);
        params
    }

    /// Fit the window starting from `guess` (NaN entries auto-filled).
    pub fn fit(&self, window: &FitWindow, guess: [f64; PARAM_COUNT]) -> FitResult {
        let initial = self.initial_guess(window, guess);
        if window.is_empty() {
            return FitResult::failed(initial);
        }

        let result = optimize(
            &Gaussian2D,
            &window.xs,
            &window.ys,
            &window.zs,
            initial,
            self.vary,
            &self.lm,
        );

        FitResult {
            params: result.params,
            errors: result.errors,
            r_squared: math::r_squared(&window.zs, result.chi2),
            iterations: result.iterations,
            converged: result.converged,
        }
    }

    /// Fit around a peak's current position with everything but the position
    /// auto-guessed.
    pub fn fit_peak(&self, window: &FitWindow, peak: &Peak) -> FitResult {
        let mut guess = [f64::NAN; PARAM_COUNT];
        guess[X] = peak.x();
        guess[Y] = peak.y();
        self.fit(window, guess)
    }
}

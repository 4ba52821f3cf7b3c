//! Configuration for [`PeakFinder`](super::PeakFinder).
//!
//! One flat struct grouped by pipeline stage. Every field has a default so a
//! partial JSON (or any serde format) config is enough.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_non_negative, ensure_positive};
use crate::fitting::{LmConfig, PeakFitter};
use crate::peak::{PARAM_COUNT, Peak};
use crate::pixel::Rect;

/// Ranking used to re-suppress fitted peaks that ended up too close together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuppressionOrder {
    /// Keep the peak with the higher R².
    #[default]
    RSquared,
    /// Keep the peak with the smaller combined position error `sqrt(ex² + ey²)`.
    CombinedError,
}

impl SuppressionOrder {
    /// Weakest-first comparator for [`crate::detection::suppress`].
    pub fn weakest_first(self, a: &Peak, b: &Peak) -> Ordering {
        match self {
            SuppressionOrder::RSquared => a.r_squared.total_cmp(&b.r_squared),
            SuppressionOrder::CombinedError => b.xy_error().total_cmp(&a.xy_error()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    // -- Detection --
    /// Pixels must exceed this (or fall below its negative) to be candidates.
    pub threshold: f64,
    /// No two reported peaks are closer than this, in pixels.
    pub minimum_distance: f64,
    /// Look for dips instead of bumps.
    pub find_negative: bool,
    /// Restrict detection to this rectangle, clipped to the frame.
    pub region: Option<Rect>,

    // -- Fitting --
    pub fit: bool,
    /// Half-size of the square fit window.
    pub fit_radius: usize,
    /// Starting Gaussian width.
    pub initial_sigma: f64,
    /// Fit the connected pixels beyond this secondary threshold instead of
    /// the square window.
    pub fit_threshold: Option<f64>,
    /// How far the thresholded window may grow from the candidate.
    pub fit_search_radius: usize,
    /// Which of `[baseline, height, x, y, sigma]` the fit may change.
    pub vary: [bool; PARAM_COUNT],
    /// Reject fits whose standard error exceeds these bounds.
    pub max_error: Option<[f64; PARAM_COUNT]>,
    /// Reject fits below this R².
    pub min_r_squared: Option<f64>,
    /// Re-run suppression on fitted positions, ranked by fit quality.
    pub suppression: Option<SuppressionOrder>,
    pub lm: LmConfig,

    // -- Integration --
    pub integrate: bool,
    pub inner_radius: usize,
    pub outer_radius: usize,

    // -- Output --
    /// Stamped onto every peak.
    pub channel: usize,
    /// Record extra per-peak properties.
    pub verbose: bool,

    // -- Execution --
    /// Dedicated worker count; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            // Detection
            threshold: 50.0,
            minimum_distance: 4.0,
            find_negative: false,
            region: None,

            // Fitting
            fit: true,
            fit_radius: 2,
            initial_sigma: 1.0,
            fit_threshold: None,
            fit_search_radius: 8,
            vary: [true; PARAM_COUNT],
            max_error: Some([1e3, 1e3, 1.0, 1.0, 1.0]),
            min_r_squared: None,
            suppression: Some(SuppressionOrder::RSquared),
            lm: LmConfig::default(),

            // Integration
            integrate: true,
            inner_radius: 2,
            outer_radius: 4,

            // Output
            channel: 0,
            verbose: false,

            // Execution
            threads: None,
        }
    }
}

impl FinderConfig {
    /// Check every parameter, failing on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        // Detection
        ensure_non_negative("threshold", self.threshold)?;
        ensure_non_negative("minimum_distance", self.minimum_distance)?;
        if let Some(region) = &self.region
            && region.is_empty()
        {
            return Err(Error::invalid(
                "region",
                format!("must not be empty, got {}x{}", region.width, region.height),
            ));
        }

        // Fitting
        if self.fit {
            if self.fit_radius == 0 {
                return Err(Error::invalid("fit_radius", "must be at least 1"));
            }
            ensure_positive("initial_sigma", self.initial_sigma)?;
            if let Some(threshold) = self.fit_threshold {
                ensure_non_negative("fit_threshold", threshold)?;
                if self.fit_search_radius == 0 {
                    return Err(Error::invalid("fit_search_radius", "must be at least 1"));
                }
            }
            if let Some(max_error) = &self.max_error {
                for &bound in max_error {
                    ensure_non_negative("max_error", bound)?;
                }
            }
            if let Some(min) = self.min_r_squared
                && !min.is_finite()
            {
                return Err(Error::invalid(
                    "min_r_squared",
                    format!("must be finite, got {min}"),
                ));
            }
            self.lm.validate()?;
        }

        // Integration
        if self.integrate && self.inner_radius > self.outer_radius {
            return Err(Error::InvertedRange {
                name: "inner_radius/outer_radius",
                min: self.inner_radius as f64,
                max: self.outer_radius as f64,
            });
        }

        // Execution
        if self.threads == Some(0) {
            return Err(Error::invalid("threads", "must be at least 1"));
        }

        Ok(())
    }

    /// Fitter configured from the fitting section.
    pub fn fitter(&self) -> PeakFitter {
        PeakFitter {
            lm: self.lm.clone(),
            vary: self.vary,
            initial_sigma: self.initial_sigma,
            find_negative: self.find_negative,
        }
    }
}

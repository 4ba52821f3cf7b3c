//! Configuration for [`Tracker`](super::Tracker).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_non_negative, ensure_positive};

/// Largest allowed change between two linked peaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxDifference {
    pub baseline: f64,
    pub height: f64,
    /// Pixels.
    pub x: f64,
    /// Pixels.
    pub y: f64,
    pub sigma: f64,
    /// Frames a trajectory may skip, at least 1 (consecutive frames).
    pub frame_gap: usize,
}

impl Default for MaxDifference {
    fn default() -> Self {
        Self {
            baseline: 1e3,
            height: 1e3,
            x: 1.0,
            y: 1.0,
            sigma: 1.0,
            frame_gap: 1,
        }
    }
}

impl MaxDifference {
    /// Search radius that covers the x/y box.
    #[inline]
    pub fn search_radius(&self) -> f64 {
        self.x.max(self.y)
    }
}

/// Which fitted features are compared when linking. Position is always checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureChecks {
    pub baseline: bool,
    pub height: bool,
    pub sigma: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_difference: MaxDifference,
    pub checks: FeatureChecks,
    /// A link is refused when its target lies this close to an already
    /// tracked peak of the frames it spans.
    pub minimum_distance: f64,
    /// Shorter trajectories are discarded.
    pub min_trajectory_length: usize,
    /// Output positions are multiplied by this.
    pub pixel_size: f64,
    /// Add fit and background columns to every row.
    pub verbose: bool,
    /// Dedicated worker count; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_difference: MaxDifference::default(),
            checks: FeatureChecks::default(),
            minimum_distance: 4.0,
            min_trajectory_length: 2,
            pixel_size: 1.0,
            verbose: false,
            threads: None,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        let max = &self.max_difference;
        ensure_non_negative("max_difference.x", max.x)?;
        ensure_non_negative("max_difference.y", max.y)?;
        if self.checks.baseline {
            ensure_non_negative("max_difference.baseline", max.baseline)?;
        }
        if self.checks.height {
            ensure_non_negative("max_difference.height", max.height)?;
        }
        if self.checks.sigma {
            ensure_non_negative("max_difference.sigma", max.sigma)?;
        }
        if max.frame_gap == 0 {
            return Err(Error::invalid(
                "max_difference.frame_gap",
                "must be at least 1",
            ));
        }

        ensure_non_negative("minimum_distance", self.minimum_distance)?;
        ensure_positive("pixel_size", self.pixel_size)?;
        if self.threads == Some(0) {
            return Err(Error::invalid("threads", "must be at least 1"));
        }
        Ok(())
    }
}

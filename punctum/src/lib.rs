//! Punctum - point-like feature localization and tracking for image stacks.
//!
//! This library finds bright (or dark) spots in sequences of 2D frames and
//! follows them over time:
//! - Threshold detection with non-maximum suppression
//! - Sub-pixel 2D Gaussian fitting (Levenberg-Marquardt)
//! - Background-corrected intensity integration
//! - Greedy conflict-free multi-frame linking into trajectories
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use punctum::prelude::*;
//!
//! let stack = FrameStack::new(width, height, frames)?;
//! let progress = Progress::new();
//!
//! let finder = PeakFinder::new(FinderConfig::default())?;
//! let mut peaks = finder.find_all(&stack, &progress);
//!
//! let tracker = Tracker::new(TrackerConfig::default())?;
//! let trajectories = tracker.track(&mut peaks, &progress);
//!
//! println!("Linked {} trajectories", trajectories.len());
//! ```

pub mod detection;
pub mod error;
pub mod finder;
pub mod fitting;
pub mod integration;
pub(crate) mod math;
pub mod peak;
pub mod pixel;
pub mod progress;
pub mod spatial;
pub mod tracking;

#[cfg(test)]
pub(crate) mod testing;


pub mod prelude;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use peak::{Peak, PeakHandle, PeakStack, TrackId};
pub use pixel::{FrameStack, PixelSource, Rect, Sample};
pub use progress::Progress;

// ============================================================================
// Peak finding
// ============================================================================

pub use finder::{FinderConfig, FrameDiagnostics, PeakFinder, SuppressionOrder};
pub use fitting::{FitRejection, FitResult, LmConfig, PeakFitter};
pub use integration::{Integration, OffsetCache};

// ============================================================================
// Tracking
// ============================================================================

pub use tracking::{
    FeatureChecks, MaxDifference, PeakLink, Tracker, TrackerConfig, Trajectory, TrajectoryRow,
};

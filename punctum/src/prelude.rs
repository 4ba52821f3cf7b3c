//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use punctum::prelude::*;
//! ```

// Input
pub use crate::{FrameStack, PixelSource, Progress, Rect, Sample};

// Peak finding - main API
pub use crate::{FinderConfig, Peak, PeakFinder, PeakStack, SuppressionOrder};

// Tracking - main API
pub use crate::{MaxDifference, TrackId, Tracker, TrackerConfig, Trajectory};

pub use crate::{Error, Result};

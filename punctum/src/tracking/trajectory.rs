//! Linked peaks materialised into per-frame rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::peak::{PeakHandle, PeakStack, TrackId, X, Y};

/// Extra row columns written in verbose mode.
pub const VERBOSE_COLUMNS: [&str; 8] = [
    "baseline",
    "height",
    "sigma",
    "r_squared",
    "median_background",
    "pixel_value",
    "x_error",
    "y_error",
];

/// One frame of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub t: usize,
    /// Position scaled by the pixel size.
    pub x: f64,
    pub y: f64,
    pub intensity: f64,
    /// Verbose columns plus the peak's own properties, by name.
    pub columns: BTreeMap<String, f64>,
}

/// A peak followed through strictly increasing frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: TrackId,
    /// Member peaks, first frame first.
    pub peaks: Vec<PeakHandle>,
    pub rows: Vec<TrajectoryRow>,
}

impl Trajectory {
    /// Build rows from the member handles.
    pub(crate) fn materialize(
        stack: &PeakStack,
        id: TrackId,
        peaks: Vec<PeakHandle>,
        pixel_size: f64,
        verbose: bool,
    ) -> Self {
        let rows = peaks
            .iter()
            .map(|&handle| {
                let peak = stack.get(handle);
                let mut columns = BTreeMap::new();
                if verbose {
                    let values = [
                        peak.baseline,
                        peak.height,
                        peak.sigma,
                        peak.r_squared,
                        peak.median_background,
                        peak.pixel_value,
                        peak.fit_errors[X] * pixel_size,
                        peak.fit_errors[Y] * pixel_size,
                    ];
                    for (name, value) in VERBOSE_COLUMNS.iter().zip(values) {
                        columns.insert((*name).to_string(), value);
                    }
                    for (name, &value) in &peak.properties {
                        columns.insert(name.clone(), value);
                    }
                }
                TrajectoryRow {
                    t: handle.frame,
                    x: peak.x() * pixel_size,
                    y: peak.y() * pixel_size,
                    intensity: peak.intensity,
                    columns,
                }
            })
            .collect();

        Self { id, peaks, rows }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn first_frame(&self) -> Option<usize> {
        self.peaks.first().map(|h| h.frame)
    }

    pub fn last_frame(&self) -> Option<usize> {
        self.peaks.last().map(|h| h.frame)
    }

    /// Row for frame `t`, if the trajectory visits it.
    pub fn row_at(&self, t: usize) -> Option<&TrajectoryRow> {
        self.rows
            .binary_search_by_key(&t, |row| row.t)
            .ok()
            .map(|i| &self.rows[i])
    }
}

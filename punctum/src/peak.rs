//! Peak records and the frame-indexed arena that owns them.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Index of a fitted parameter in `[baseline, height, x0, y0, sigma]` arrays.
pub const BASELINE: usize = 0;
pub const HEIGHT: usize = 1;
pub const X: usize = 2;
pub const Y: usize = 3;
pub const SIGMA: usize = 4;

/// Number of Gaussian model parameters.
pub const PARAM_COUNT: usize = 5;

/// Stable identifier shared by every peak of one trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Mint a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning reference to a peak: frame index plus slot within that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeakHandle {
    pub frame: usize,
    pub slot: usize,
}

impl PeakHandle {
    pub fn new(frame: usize, slot: usize) -> Self {
        Self { frame, slot }
    }
}

/// A detected or fitted point-like intensity feature in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peak {
    /// Externally assigned unique id. Not needed during detection.
    pub id: Option<String>,
    /// Sub-pixel position. Integer coordinates until fitted.
    pub pos: DVec2,
    /// Observed sample at the detection pixel.
    pub pixel_value: f64,
    pub baseline: f64,
    pub height: f64,
    pub sigma: f64,
    /// Standard errors in `[baseline, height, x, y, sigma]` order.
    pub fit_errors: [f64; PARAM_COUNT],
    pub r_squared: f64,
    /// Frame index.
    pub t: usize,
    /// Channel index.
    pub c: usize,
    pub intensity: f64,
    pub median_background: f64,
    /// Pipeline-specific extras, ordered by name.
    pub properties: BTreeMap<String, f64>,
    #[serde(skip, default = "valid_by_default")]
    pub valid: bool,
    #[serde(skip)]
    pub forward: Option<PeakHandle>,
    #[serde(skip)]
    pub backward: Option<PeakHandle>,
    pub track_id: Option<TrackId>,
}

fn valid_by_default() -> bool {
    true
}

impl Peak {
    /// Candidate peak at an integer pixel.
    pub fn candidate(x: i64, y: i64, pixel_value: f64, t: usize) -> Self {
        Self {
            id: None,
            pos: DVec2::new(x as f64, y as f64),
            pixel_value,
            baseline: f64::NAN,
            height: f64::NAN,
            sigma: f64::NAN,
            fit_errors: [f64::NAN; PARAM_COUNT],
            r_squared: f64::NAN,
            t,
            c: 0,
            intensity: f64::NAN,
            median_background: f64::NAN,
            properties: BTreeMap::new(),
            valid: true,
            forward: None,
            backward: None,
            track_id: None,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.pos.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.pos.y
    }

    /// Fitted parameters in `[baseline, height, x, y, sigma]` order.
    pub fn params(&self) -> [f64; PARAM_COUNT] {
        [self.baseline, self.height, self.pos.x, self.pos.y, self.sigma]
    }

    pub fn set_params(&mut self, params: &[f64; PARAM_COUNT]) {
        self.baseline = params[BASELINE];
        self.height = params[HEIGHT];
        self.pos = DVec2::new(params[X], params[Y]);
        self.sigma = params[SIGMA];
    }

    /// Combined positional error `sqrt(ex² + ey²)`.
    pub fn xy_error(&self) -> f64 {
        self.fit_errors[X].hypot(self.fit_errors[Y])
    }

    /// Mark invalid; invalid peaks are skipped by every downstream stage.
    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// A valid peak always has a finite position.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.valid && self.pos.is_finite()
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: f64) {
        self.properties.insert(name.into(), value);
    }
}

/// Frame-indexed peak arena. Frame `t` lives at index `t`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeakStack {
    frames: Vec<Vec<Peak>>,
}

impl PeakStack {
    pub fn new(frames: Vec<Vec<Peak>>) -> Self {
        Self { frames }
    }

    /// Stack of `frame_count` empty frames.
    pub fn with_frames(frame_count: usize) -> Self {
        Self {
            frames: vec![Vec::new(); frame_count],
        }
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, t: usize) -> &[Peak] {
        &self.frames[t]
    }

    pub fn frame_mut(&mut self, t: usize) -> &mut Vec<Peak> {
        &mut self.frames[t]
    }

    pub fn frames(&self) -> &[Vec<Peak>] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Vec<Peak>> {
        self.frames
    }

    /// Total number of peaks over all frames.
    pub fn peak_count(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn get(&self, handle: PeakHandle) -> &Peak {
        &self.frames[handle.frame][handle.slot]
    }

    #[inline]
    pub fn get_mut(&mut self, handle: PeakHandle) -> &mut Peak {
        &mut self.frames[handle.frame][handle.slot]
    }

    /// Handles of every peak in `(frame, slot)` order.
    pub fn handles(&self) -> impl Iterator<Item = PeakHandle> + '_ {
        self.frames.iter().enumerate().flat_map(|(frame, peaks)| {
            (0..peaks.len()).map(move |slot| PeakHandle::new(frame, slot))
        })
    }

    /// Drop tracking state from every peak.
    pub fn clear_links(&mut self) {
        for peak in self.frames.iter_mut().flatten() {
            peak.forward = None;
            peak.backward = None;
            peak.track_id = None;
        }
    }
}

//! Background-corrected intensity of a peak.
//!
//! The signal is summed over a disc of radius `inner` around the peak's
//! rounded position. The background is the median of the surrounding annulus
//! `inner < d <= outer`, scaled by the disc size and subtracted. Distances are
//! rounded to whole pixels, so a radius-2 disc holds 21 offsets.


use glam::DVec2;
use hashbrown::HashMap;

use crate::math::median_f64_mut;
use crate::peak::Peak;
use crate::pixel::PixelSource;

/// Property name of the disc sum before background correction.
pub const UNCORRECTED_INTENSITY: &str = "uncorrected_intensity";

/// Pixel offsets of the disc and the annulus for one pair of radii.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnulusOffsets {
    pub inner: usize,
    pub outer: usize,
    pub disc: Vec<(i64, i64)>,
    pub annulus: Vec<(i64, i64)>,
}

impl AnnulusOffsets {
    /// Offsets in row-major order with `d = round(sqrt(dx² + dy²))`.
    pub fn new(inner: usize, outer: usize) -> Self {
        let reach = inner.max(outer) as i64;
        let mut disc = Vec::new();
        let mut annulus = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d = ((dx * dx + dy * dy) as f64).sqrt().round() as usize;
                if d <= inner {
                    disc.push((dx, dy));
                } else if d <= outer {
                    annulus.push((dx, dy));
                }
            }
        }
        Self {
            inner,
            outer,
            disc,
            annulus,
        }
    }
}

/// Offsets keyed by `(inner, outer)`, computed on first use.
///
/// Owned by whoever drives the integration; each worker may keep its own.
#[derive(Debug, Default)]
pub struct OffsetCache {
    offsets: HashMap<(usize, usize), AnnulusOffsets>,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, inner: usize, outer: usize) -> &AnnulusOffsets {
        self.offsets
            .entry((inner, outer))
            .or_insert_with(|| AnnulusOffsets::new(inner, outer))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}

/// Result of integrating one peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration {
    /// Disc sum minus `background × disc size`.
    pub intensity: f64,
    /// Median of the annulus.
    pub background: f64,
    /// Disc sum without correction.
    pub uncorrected: f64,
}

impl Integration {
    const NAN: Self = Self {
        intensity: f64::NAN,
        background: f64::NAN,
        uncorrected: f64::NAN,
    };

    /// Store on the peak; `verbose` also records the uncorrected sum.
    pub fn apply_to(&self, peak: &mut Peak, verbose: bool) {
        peak.intensity = self.intensity;
        peak.median_background = self.background;
        if verbose {
            peak.set_property(UNCORRECTED_INTENSITY, self.uncorrected);
        }
    }
}

/// Integrate around `pos` in frame `t`.
///
/// A non-finite coordinate yields NaN intensity and background. Pixels
/// beyond the frame are read through the source's mirror extension.
/// `scratch` is reused for the annulus samples.
pub fn integrate<S: PixelSource + ?Sized>(
    source: &S,
    t: usize,
    pos: DVec2,
    offsets: &AnnulusOffsets,
    scratch: &mut Vec<f64>,
) -> Integration {
    if !pos.is_finite() {
        return Integration::NAN;
    }

    let cx = pos.x.round() as i64;
    let cy = pos.y.round() as i64;

    let uncorrected: f64 = offsets
        .disc
        .iter()
        .map(|&(dx, dy)| source.get(cx + dx, cy + dy, t))
        .sum();

    scratch.clear();
    scratch.extend(
        offsets
            .annulus
            .iter()
            .map(|&(dx, dy)| source.get(cx + dx, cy + dy, t)),
    );
    let background = median_f64_mut(scratch);

    Integration {
        intensity: uncorrected - background * offsets.disc.len() as f64,
        background,
        uncorrected,
    }
}

//! Threshold-based peak candidate detection with non-maximum suppression.
//!
//! # Algorithm
//!
//! 1. Every pixel of the region beyond the threshold becomes a candidate.
//! 2. Candidates are stable-sorted weakest first (row-major scan order breaks ties).
//! 3. A [`KdTree`] is built over candidate slots.
//! 4. Walking strongest to weakest, each still-valid candidate is accepted and
//!    every slot within `minimum_distance` of it (itself included) is invalidated.
//!
//! Equal values are therefore resolved in reverse scan order. That order is
//! deterministic but carries no meaning.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use crate::peak::Peak;
use crate::pixel::{PixelSource, Rect};
use crate::progress::Progress;
use crate::spatial::KdTree;

/// Find local-maximum candidates in `region` of frame `t`.
///
/// Positive mode keeps pixels `> threshold`; negative mode keeps pixels
/// `< -threshold` and treats the most negative value as the strongest.
/// No two returned peaks are closer than `minimum_distance`. Cancellation
/// returns the peaks accepted so far.
pub fn find_peaks<S: PixelSource + ?Sized>(
    source: &S,
    t: usize,
    region: &Rect,
    threshold: f64,
    minimum_distance: f64,
    find_negative: bool,
    progress: &Progress,
) -> Vec<Peak> {
    let mut candidates = Vec::new();
    for y in region.y..region.max_y() {
        if progress.is_cancelled() {
            return Vec::new();
        }
        for x in region.x..region.max_x() {
            let value = source.get(x, y, t);
            let qualifies = if find_negative {
                value < -threshold
            } else {
                value > threshold
            };
            if qualifies {
                candidates.push(Peak::candidate(x, y, value, t));
            }
        }
    }

    let weakest_first: fn(&Peak, &Peak) -> Ordering = if find_negative {
        |a, b| b.pixel_value.total_cmp(&a.pixel_value)
    } else {
        |a, b| a.pixel_value.total_cmp(&b.pixel_value)
    };

    suppress(candidates, minimum_distance, weakest_first, progress)
}

/// Non-maximum suppression over arbitrary peaks.
///
/// `weakest_first` orders peaks from weakest to strongest. Peaks that are not
/// usable (invalid or non-finite position) are dropped up front. Accepted
/// peaks are returned strongest first.
pub fn suppress<F>(
    peaks: Vec<Peak>,
    minimum_distance: f64,
    weakest_first: F,
    progress: &Progress,
) -> Vec<Peak>
where
    F: Fn(&Peak, &Peak) -> Ordering,
{
    let mut peaks: Vec<Peak> = peaks.into_iter().filter(Peak::is_usable).collect();
    if peaks.len() <= 1 {
        return peaks;
    }

    peaks.sort_by(&weakest_first);

    let items = peaks.iter().enumerate().map(|(slot, p)| (slot, p.pos));
    let Some(tree) = KdTree::build(items) else {
        return Vec::new();
    };

    let mut accepted = Vec::new();
    for slot in (0..peaks.len()).rev() {
        if progress.is_cancelled() {
            break;
        }
        if !peaks[slot].valid {
            continue;
        }
        accepted.push(slot);
        for (neighbor, _) in tree.radius_search(peaks[slot].pos, minimum_distance) {
            peaks[neighbor].invalidate();
        }
    }

    // Slots are strictly decreasing: swap_remove only moves peaks from above
    // the current slot, none of which are still to be taken.
    accepted
        .into_iter()
        .map(|slot| {
            let mut peak = peaks.swap_remove(slot);
            peak.valid = true;
            peak
        })
        .collect()
}

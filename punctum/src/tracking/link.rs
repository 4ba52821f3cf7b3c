//! Candidate links between peaks of nearby frames.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::TrackerConfig;
use crate::peak::{Peak, PeakHandle, PeakStack};
use crate::progress::Progress;
use crate::spatial::KdTree;

/// A possible connection from a peak to one in a later frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakLink {
    pub from: PeakHandle,
    pub to: PeakHandle,
    pub dist_sq: f64,
    /// `to.frame - from.frame`, at least 1.
    pub gap: usize,
}

/// One tree per frame over its usable peaks, `None` for frames without any.
pub(crate) fn build_indices(stack: &PeakStack) -> Vec<Option<KdTree>> {
    stack
        .frames()
        .par_iter()
        .map(|peaks| {
            KdTree::build(
                peaks
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.is_usable())
                    .map(|(slot, p)| (slot, p.pos)),
            )
        })
        .collect()
}

/// Candidate links grouped by source frame, each group ordered by
/// ascending gap then ascending squared distance.
pub(crate) fn candidate_links(
    stack: &PeakStack,
    indices: &[Option<KdTree>],
    config: &TrackerConfig,
    progress: &Progress,
) -> Vec<Vec<PeakLink>> {
    (0..stack.frame_count())
        .into_par_iter()
        .map(|frame| {
            let links = links_from_frame(stack, indices, frame, config, progress);
            progress.frame_done();
            links
        })
        .collect()
}

fn links_from_frame(
    stack: &PeakStack,
    indices: &[Option<KdTree>],
    frame: usize,
    config: &TrackerConfig,
    progress: &Progress,
) -> Vec<PeakLink> {
    let max = &config.max_difference;
    let radius = max.search_radius();
    let last = (frame + max.frame_gap).min(stack.frame_count().saturating_sub(1));

    let mut links = Vec::new();
    for (slot, from) in stack.frame(frame).iter().enumerate() {
        if progress.is_cancelled() {
            break;
        }
        if !from.is_usable() {
            continue;
        }
        for target_frame in (frame + 1)..=last {
            let Some(tree) = &indices[target_frame] else {
                continue;
            };
            let targets = stack.frame(target_frame);
            for (target_slot, dist_sq) in tree.radius_search(from.pos, radius) {
                if is_compatible(from, &targets[target_slot], config) {
                    links.push(PeakLink {
                        from: PeakHandle::new(frame, slot),
                        to: PeakHandle::new(target_frame, target_slot),
                        dist_sq,
                        gap: target_frame - frame,
                    });
                }
            }
        }
    }

    links.sort_by(|a, b| a.gap.cmp(&b.gap).then(a.dist_sq.total_cmp(&b.dist_sq)));
    links
}

/// Position box plus every enabled feature check. NaN features never pass.
fn is_compatible(from: &Peak, to: &Peak, config: &TrackerConfig) -> bool {
    let max = &config.max_difference;
    let checks = &config.checks;
    let within = |a: f64, b: f64, limit: f64| (a - b).abs() <= limit;

    within(from.x(), to.x(), max.x)
        && within(from.y(), to.y(), max.y)
        && (!checks.baseline || within(from.baseline, to.baseline, max.baseline))
        && (!checks.height || within(from.height, to.height, max.height))
        && (!checks.sigma || within(from.sigma, to.sigma, max.sigma))
}

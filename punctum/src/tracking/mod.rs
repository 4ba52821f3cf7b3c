//! Multi-frame tracking: links peaks into trajectories.
//!
//! # Algorithm
//!
//! 1. **Index**: one [`KdTree`](crate::spatial::KdTree) per frame over its
//!    valid peaks (parallel).
//! 2. **Candidates**: every valid peak queries the next `frame_gap` frames
//!    and keeps neighbours inside the x/y box and enabled feature limits
//!    (parallel per source frame).
//! 3. **Resolve**: frames ascending, links by gap then distance. A link is
//!    taken only if its source has no successor, its target has no
//!    predecessor and no peak near the target in the next `frame_gap`
//!    frames is already tracked. Sequential, it mutates the stack.
//! 4. **Materialise**: follow forward links from every head, drop chains
//!    shorter than the minimum length (parallel per head).
//!
//! The step 3 proximity check covers frames `from + 1 ..= from + frame_gap`
//! only, never the source frame or earlier ones.


mod config;
mod link;
mod trajectory;

pub use config::{FeatureChecks, MaxDifference, TrackerConfig};
pub use link::PeakLink;
pub use trajectory::{Trajectory, TrajectoryRow, VERBOSE_COLUMNS};

use rayon::prelude::*;

use crate::error::Result;
use crate::peak::{PeakHandle, PeakStack, TrackId};
use crate::progress::Progress;
use crate::spatial::KdTree;

/// Links peaks across frames into [`Trajectory`] values.
#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Tracker {
    /// Validate the config and, if requested, build a dedicated worker pool.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Link the peaks of `stack` and return the trajectories that are long
    /// enough.
    ///
    /// Earlier links and track ids on the stack are cleared first. Afterwards
    /// every peak either belongs to exactly one returned trajectory (and
    /// carries its id and links) or is unlinked. Only link fields are written;
    /// peak geometry is never touched. The progress counter advances once per
    /// source frame of candidate generation.
    pub fn track(&self, stack: &mut PeakStack, progress: &Progress) -> Vec<Trajectory> {
        match &self.pool {
            Some(pool) => pool.install(|| self.track_stack(stack, progress)),
            None => self.track_stack(stack, progress),
        }
    }

    fn track_stack(&self, stack: &mut PeakStack, progress: &Progress) -> Vec<Trajectory> {
        stack.clear_links();

        let indices = link::build_indices(stack);
        let candidates = link::candidate_links(stack, &indices, &self.config, progress);
        let candidate_count: usize = candidates.iter().map(Vec::len).sum();
        tracing::debug!(
            "Generated {} candidate links over {} frames",
            candidate_count,
            stack.frame_count()
        );

        let (heads, accepted) = self.resolve(stack, &indices, &candidates, progress);

        let chains = walk_chains(stack, &heads, progress);
        let min_len = self.config.min_trajectory_length;
        let (kept, discarded): (Vec<_>, Vec<_>) =
            chains.into_iter().partition(|chain| chain.len() >= min_len);

        for handle in discarded.iter().flatten() {
            let peak = stack.get_mut(*handle);
            peak.track_id = None;
            peak.forward = None;
            peak.backward = None;
        }

        let stack: &PeakStack = stack;
        let trajectories: Vec<Trajectory> = kept
            .into_par_iter()
            .filter_map(|chain| {
                let id = stack.get(*chain.first()?).track_id?;
                Some(Trajectory::materialize(
                    stack,
                    id,
                    chain,
                    self.config.pixel_size,
                    self.config.verbose,
                ))
            })
            .collect();

        if progress.is_cancelled() {
            tracing::info!("Tracking cancelled, returning partial trajectories");
        }
        tracing::info!(
            "Accepted {} links: kept {} trajectories, discarded {} short ones",
            accepted,
            trajectories.len(),
            discarded.len()
        );
        trajectories
    }

    /// Greedy, conflict-free link acceptance. Returns the trajectory heads in
    /// acceptance order and the number of accepted links.
    fn resolve(
        &self,
        stack: &mut PeakStack,
        indices: &[Option<KdTree>],
        candidates: &[Vec<PeakLink>],
        progress: &Progress,
    ) -> (Vec<PeakHandle>, usize) {
        let mut heads = Vec::new();
        let mut accepted = 0;

        'frames: for (frame, links) in candidates.iter().enumerate() {
            for link in links {
                if progress.is_cancelled() {
                    break 'frames;
                }

                let from = stack.get(link.from);
                if from.forward.is_some() || stack.get(link.to).backward.is_some() {
                    continue;
                }
                let existing = from.track_id;
                if self.near_tracked_peak(stack, indices, frame, link) {
                    continue;
                }

                let id = match existing {
                    Some(id) => id,
                    None => {
                        let id = TrackId::new();
                        heads.push(link.from);
                        stack.get_mut(link.from).track_id = Some(id);
                        id
                    }
                };
                let source = stack.get_mut(link.from);
                source.forward = Some(link.to);
                let target = stack.get_mut(link.to);
                target.backward = Some(link.from);
                target.track_id = Some(id);
                accepted += 1;
            }
        }

        (heads, accepted)
    }

    /// Whether a peak of frames `frame + 1 ..= frame + frame_gap` within
    /// `minimum_distance` of the link target already has a track id.
    ///
    /// The whole gap window is searched whatever the link's own gap, so a
    /// short link cannot cut through a region claimed further ahead.
    fn near_tracked_peak(
        &self,
        stack: &PeakStack,
        indices: &[Option<KdTree>],
        frame: usize,
        link: &PeakLink,
    ) -> bool {
        let target = stack.get(link.to).pos;
        let radius = self.config.minimum_distance;
        let last = (frame + self.config.max_difference.frame_gap)
            .min(stack.frame_count().saturating_sub(1));
        ((frame + 1)..=last).any(|f| {
            indices[f].as_ref().is_some_and(|tree| {
                let peaks = stack.frame(f);
                tree.any_within(target, radius, |slot| peaks[slot].track_id.is_some())
            })
        })
    }
}

/// Follow forward links from each head. Walks are bounded by the frame count.
fn walk_chains(
    stack: &PeakStack,
    heads: &[PeakHandle],
    progress: &Progress,
) -> Vec<Vec<PeakHandle>> {
    let max_len = stack.frame_count();
    heads
        .par_iter()
        .map(|&head| {
            let mut chain = vec![head];
            let mut current = head;
            while let Some(next) = stack.get(current).forward {
                if chain.len() >= max_len || progress.is_cancelled() {
                    break;
                }
                chain.push(next);
                current = next;
            }
            chain
        })
        .collect()
}

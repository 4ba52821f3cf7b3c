//! Per-frame peak finding over a whole stack.
//!
//! [`PeakFinder`] runs detection, fitting, quality suppression and integration
//! for each frame as an independent rayon task and gathers the results into a
//! [`PeakStack`]. A frame that fails (error or panic) is logged and contributes
//! no peaks; the other frames are unaffected.


mod config;

pub use config::{FinderConfig, SuppressionOrder};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use crate::detection::{find_peaks, suppress};
use crate::error::{Error, Result};
use crate::fitting::{FitRejection, FitWindow, PeakFitter};
use crate::integration::{OffsetCache, integrate};
use crate::peak::{Peak, PeakStack};
use crate::pixel::PixelSource;
use crate::progress::Progress;

/// Property names written in verbose mode.
pub const FIT_ITERATIONS: &str = "fit_iterations";
pub const FIT_CONVERGED: &str = "fit_converged";

/// Stage counts for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDiagnostics {
    /// Candidates surviving detection and non-maximum suppression.
    pub candidates: usize,
    /// Fits with a non-finite parameter or error.
    pub rejected_divergent: usize,
    /// Fits with a negative position or width.
    pub rejected_implausible: usize,
    /// Fits above an error bound.
    pub rejected_error: usize,
    /// Fits below the R² minimum.
    pub rejected_r_squared: usize,
    /// Fitted peaks removed by the quality suppression pass.
    pub suppressed: usize,
    /// Peaks reported for the frame.
    pub final_count: usize,
}

impl FrameDiagnostics {
    fn record(&mut self, rejection: &FitRejection) {
        match rejection {
            FitRejection::Divergent => self.rejected_divergent += 1,
            FitRejection::Implausible => self.rejected_implausible += 1,
            FitRejection::ErrorTooLarge { .. } => self.rejected_error += 1,
            FitRejection::LowRSquared { .. } => self.rejected_r_squared += 1,
        }
    }
}

/// Runs the per-frame pipeline over a pixel source.
#[derive(Debug)]
pub struct PeakFinder {
    config: FinderConfig,
    fitter: PeakFitter,
    pool: Option<rayon::ThreadPool>,
}

impl PeakFinder {
    /// Validate the config and, if requested, build a dedicated worker pool.
    pub fn new(config: FinderConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
            None => None,
        };
        let fitter = config.fitter();
        Ok(Self {
            config,
            fitter,
            pool,
        })
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Process every frame of `source` in parallel.
    ///
    /// Frames not started before cancellation come back empty; the result
    /// always has one entry per source frame.
    pub fn find_all<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        progress: &Progress,
    ) -> PeakStack {
        let run = || self.find_all_frames(source, progress);
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn find_all_frames<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        progress: &Progress,
    ) -> PeakStack {
        let frame_count = source.frame_count();
        let frames: Vec<Vec<Peak>> = (0..frame_count)
            .into_par_iter()
            .map_init(OffsetCache::new, |cache, t| {
                if progress.is_cancelled() {
                    return Vec::new();
                }
                let peaks = self.find_frame_guarded(source, t, cache, progress);
                progress.frame_done();
                peaks
            })
            .collect();

        let stack = PeakStack::new(frames);
        if progress.is_cancelled() {
            tracing::info!(
                "Peak finding cancelled after {} of {} frames",
                progress.completed(),
                frame_count
            );
        }
        tracing::info!("Found {} peaks in {} frames", stack.peak_count(), frame_count);
        stack
    }

    /// [`find_frame`](Self::find_frame) with errors and panics turned into an
    /// empty frame.
    fn find_frame_guarded<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        t: usize,
        cache: &mut OffsetCache,
        progress: &Progress,
    ) -> Vec<Peak> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.find_frame(source, t, cache, progress)
        }));
        match outcome {
            Ok(Ok((peaks, diagnostics))) => {
                tracing::debug!("Frame {}: {:?}", t, diagnostics);
                peaks
            }
            Ok(Err(e)) => {
                tracing::warn!("Frame {} failed: {}", t, e);
                Vec::new()
            }
            Err(payload) => {
                tracing::warn!("Frame {} panicked: {}", t, panic_message(&*payload));
                Vec::new()
            }
        }
    }

    /// Run the pipeline on a single frame.
    ///
    /// `cache` holds integration offsets and may be reused across calls.
    pub fn find_frame<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        t: usize,
        cache: &mut OffsetCache,
        progress: &Progress,
    ) -> Result<(Vec<Peak>, FrameDiagnostics)> {
        let config = &self.config;
        let count = source.frame_count();
        if t >= count {
            return Err(Error::FrameIndex { index: t, count });
        }

        let mut diagnostics = FrameDiagnostics::default();
        let bounds = source.bounds(t);
        let region = match &config.region {
            Some(region) => match region.intersect(&bounds) {
                Some(region) => region,
                None => return Ok((Vec::new(), diagnostics)),
            },
            None => bounds,
        };

        let mut peaks = find_peaks(
            source,
            t,
            &region,
            config.threshold,
            config.minimum_distance,
            config.find_negative,
            progress,
        );
        diagnostics.candidates = peaks.len();

        if config.fit {
            self.fit_peaks(source, t, &mut peaks, &mut diagnostics, progress);

            if let Some(order) = config.suppression {
                let before = peaks.len();
                peaks = suppress(
                    peaks,
                    config.minimum_distance,
                    |a, b| order.weakest_first(a, b),
                    progress,
                );
                diagnostics.suppressed = before - peaks.len();
            }
        }

        if config.integrate {
            let offsets = cache.get_or_compute(config.inner_radius, config.outer_radius);
            let mut scratch = Vec::with_capacity(offsets.annulus.len());
            for peak in &mut peaks {
                integrate(source, t, peak.pos, offsets, &mut scratch)
                    .apply_to(peak, config.verbose);
            }
        }

        for peak in &mut peaks {
            peak.t = t;
            peak.c = config.channel;
        }

        diagnostics.final_count = peaks.len();
        Ok((peaks, diagnostics))
    }

    /// Fit every candidate in place and drop the rejected ones.
    ///
    /// On cancellation the candidates not yet fitted are dropped too.
    fn fit_peaks<S: PixelSource + ?Sized>(
        &self,
        source: &S,
        t: usize,
        peaks: &mut Vec<Peak>,
        diagnostics: &mut FrameDiagnostics,
        progress: &Progress,
    ) {
        let config = &self.config;
        let mut fitted = 0;
        for peak in peaks.iter_mut() {
            if progress.is_cancelled() {
                break;
            }
            let window = match config.fit_threshold {
                Some(threshold) => FitWindow::thresholded(
                    source,
                    t,
                    peak.pos,
                    config.fit_search_radius,
                    threshold,
                    config.find_negative,
                ),
                None => FitWindow::square(source, t, peak.pos, config.fit_radius),
            };

            let result = self.fitter.fit_peak(&window, peak);
            match result.validate(config.max_error.as_ref(), config.min_r_squared) {
                Ok(()) => {
                    result.apply_to(peak);
                    if config.verbose {
                        peak.set_property(FIT_ITERATIONS, result.iterations as f64);
                        peak.set_property(FIT_CONVERGED, f64::from(u8::from(result.converged)));
                    }
                }
                Err(rejection) => {
                    diagnostics.record(&rejection);
                    peak.invalidate();
                }
            }
            fitted += 1;
        }

        peaks.truncate(fitted);
        peaks.retain(|p| p.valid);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

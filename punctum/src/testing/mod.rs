//! Testing utilities for punctum.

#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::pixel::FrameStack;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A symmetric Gaussian spot to render into a synthetic frame.
#[derive(Debug, Clone, Copy)]
pub struct Spot {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub sigma: f64,
}

impl Spot {
    pub fn new(x: f64, y: f64, height: f64, sigma: f64) -> Self {
        Self {
            x,
            y,
            height,
            sigma,
        }
    }
}

/// Render spots on a constant baseline, row-major.
pub fn gaussian_frame(width: usize, height: usize, baseline: f64, spots: &[Spot]) -> Vec<f64> {
    let mut pixels = vec![baseline; width * height];
    for spot in spots {
        let two_sigma_sq = 2.0 * spot.sigma * spot.sigma;
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 - spot.x;
                let dy = y as f64 - spot.y;
                pixels[y * width + x] += spot.height * (-(dx * dx + dy * dy) / two_sigma_sq).exp();
            }
        }
    }
    pixels
}

/// One frame per entry of `frames`, each rendered with [`gaussian_frame`].
pub fn gaussian_stack(
    width: usize,
    height: usize,
    baseline: f64,
    frames: &[Vec<Spot>],
) -> FrameStack<f64> {
    let frames = frames
        .iter()
        .map(|spots| gaussian_frame(width, height, baseline, spots))
        .collect();
    FrameStack::new(width, height, frames).unwrap()
}

/// Add uniform noise in `[-amplitude, amplitude)`, reproducible by seed.
pub fn add_uniform_noise(pixels: &mut [f64], amplitude: f64, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for v in pixels.iter_mut() {
        *v += rng.random_range(-amplitude..amplitude);
    }
}

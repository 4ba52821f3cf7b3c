//! Pixel access: sample types, frame rectangles and the [`PixelSource`] trait.
//!
//! Image decoding lives outside this crate. Anything that can hand out samples
//! by integer coordinate and frame index can drive the pipeline by implementing
//! [`PixelSource`]; [`FrameStack`] is the in-memory implementation.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric pixel sample that converts to and from `f64`.
pub trait Sample: Copy + Send + Sync + 'static {
    fn to_f64(self) -> f64;

    /// Converts back, saturating at the type's range for integer samples.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_sample {
    ($($t:ty),* $(,)?) => {
        $(
            impl Sample for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_sample!(u8, u16, u32, i8, i16, i32, f32, f64);

/// Axis-aligned integer rectangle, `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn max_x(&self) -> i64 {
        self.x + self.width as i64
    }

    #[inline]
    pub fn max_y(&self) -> i64 {
        self.y + self.height as i64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.max_x() && y >= self.y && y < self.max_y()
    }

    /// Overlap of two rectangles, `None` when they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
    }

    /// Reflect `(x, y)` into the rectangle.
    ///
    /// Infinite single mirror: the border sample is not repeated, so with a
    /// width of 5 the column sequence `-2, -1, 0 .. 4, 5, 6` maps to
    /// `2, 1, 0 .. 4, 3, 2`. The rectangle must not be empty.
    #[inline]
    pub fn mirror(&self, x: i64, y: i64) -> (i64, i64) {
        (
            self.x + mirror_index(x - self.x, self.width as i64),
            self.y + mirror_index(y - self.y, self.height as i64),
        )
    }
}

#[inline]
fn mirror_index(i: i64, n: i64) -> i64 {
    debug_assert!(n > 0);
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m < n { m } else { period - m }
}

/// Random access to a (possibly multi-frame) grid of samples.
///
/// `get` must accept any integer coordinate: out-of-bounds access is resolved
/// by mirror extension of the frame's [`bounds`](PixelSource::bounds).
pub trait PixelSource: Sync {
    fn frame_count(&self) -> usize;

    fn bounds(&self, t: usize) -> Rect;

    fn get(&self, x: i64, y: i64, t: usize) -> f64;
}

/// In-memory frame stack, row-major samples per frame.
#[derive(Debug, Clone)]
pub struct FrameStack<T: Sample> {
    width: usize,
    height: usize,
    frames: Vec<Vec<T>>,
}

impl<T: Sample> FrameStack<T> {
    /// Build a stack, checking that every frame holds `width * height` samples.
    pub fn new(width: usize, height: usize, frames: Vec<Vec<T>>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(
                "width/height",
                format!("frame size must be non-zero, got {width}x{height}"),
            ));
        }
        let expected = width * height;
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.len() != expected)
        {
            return Err(Error::FrameSize {
                index,
                width,
                height,
                expected,
                actual: frame.len(),
            });
        }
        Ok(Self {
            width,
            height,
            frames,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame(&self, t: usize) -> &[T] {
        &self.frames[t]
    }
}

impl<T: Sample> PixelSource for FrameStack<T> {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn bounds(&self, _t: usize) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn get(&self, x: i64, y: i64, t: usize) -> f64 {
        let (mx, my) = Rect::from_size(self.width, self.height).mirror(x, y);
        self.frames[t][my as usize * self.width + mx as usize].to_f64()
    }
}

//! Full-frame color matching.
//!
//! A pixel matches when every RGB channel lies within `tolerance` of the
//! target channel: `t - d <= v <= t + d`. Bounds are computed in signed
//! arithmetic so they never wrap; alpha is ignored.

use crate::color::Rgb;
use crate::frame::RgbaFrameView;
use crate::params::Tolerance;

/// Precomputed inclusive per-channel bounds for one target/tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorMatcher {
    lo: [i64; 3],
    hi: [i64; 3],
}

impl ColorMatcher {
    pub fn new(target: Rgb, tolerance: Tolerance) -> Self {
        let d = i64::from(tolerance.0);
        let t = target.channels().map(i64::from);
        Self {
            lo: t.map(|c| c - d),
            hi: t.map(|c| c + d),
        }
    }

    #[inline]
    pub fn pixel_matches(&self, px: &[u8]) -> bool {
        (0..3).all(|c| {
            let v = i64::from(px[c]);
            self.lo[c] <= v && v <= self.hi[c]
        })
    }

    /// True if any pixel matches. Stops at the first hit.
    pub fn matches(&self, frame: &RgbaFrameView<'_>) -> bool {
        self.position(frame).is_some()
    }

    /// Coordinates `(x, y)` of the first matching pixel in row-major order.
    pub fn find(&self, frame: &RgbaFrameView<'_>) -> Option<(usize, usize)> {
        let i = self.position(frame)?;
        Some((i % frame.width, i / frame.width))
    }

    fn position(&self, frame: &RgbaFrameView<'_>) -> Option<usize> {
        if frame.is_empty() {
            return None;
        }
        let n = frame.width * frame.height;
        frame
            .data
            .chunks_exact(4)
            .take(n)
            .position(|px| self.pixel_matches(px))
    }
}

/// Whether any pixel of `frame` is within `tolerance` of `target`.
pub fn matches(frame: &RgbaFrameView<'_>, target: Rgb, tolerance: Tolerance) -> bool {
    ColorMatcher::new(target, tolerance).matches(frame)
}

/// First matching pixel, if any.
pub fn find_match(
    frame: &RgbaFrameView<'_>,
    target: Rgb,
    tolerance: Tolerance,
) -> Option<(usize, usize)> {
    ColorMatcher::new(target, tolerance).find(frame)
}

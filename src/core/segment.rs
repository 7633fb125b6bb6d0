//! Line Segments
//!
//! Segment-segment intersection for sight and travel queries. One policy
//! everywhere: endpoint touches count as intersections, parallel and
//! degenerate (zero-length) pairs do not intersect.

use serde::{Deserialize, Serialize};

use super::vec2::Vec2;

/// Line segment between two points.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint
    pub a: Vec2,
    /// Second endpoint
    pub b: Vec2,
}

impl Segment {
    /// Create a segment from two endpoints.
    #[inline]
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Direction vector from `a` to `b` (not normalized).
    #[inline]
    pub fn delta(self) -> Vec2 {
        self.b - self.a
    }

    /// Intersection point with another segment, if any.
    ///
    /// Parametric cross-product test: both parameters must land in
    /// `[0, 1]` inclusive, so touching an endpoint counts. Parallel,
    /// collinear and zero-length pairs return `None`.
    pub fn intersection(self, other: Self) -> Option<Vec2> {
        let r = self.delta();
        let s = other.delta();

        let denom = r.cross(s);
        if denom == 0.0 {
            return None;
        }

        let offset = other.a - self.a;
        let t = offset.cross(s) / denom;
        let u = offset.cross(r) / denom;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(self.a + r.scale(t))
        } else {
            None
        }
    }

    /// Whether this segment crosses another.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.intersection(other).is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================

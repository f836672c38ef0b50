//! Axis-aligned bounding box used for quadtree cells and query rectangles.
//!
//! Quadtrees only index points, so every test here is inclusive on all edges:
//! a point lying exactly on a shared edge must be reachable from either side.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box represented by minimum and maximum points
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// The minimum point
    pub min: Vec2,
    /// The maximum point
    pub max: Vec2,
}

impl Bounds {
    /// Creates a new bounds from minimum and maximum points
    ///
    /// Note: This doesn't validate that min is actually less than max.
    /// Use `from_corners` if you need automatic ordering.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates bounds from an origin point and size
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    /// Creates bounds from center point and half-extents (half width/height)
    pub fn from_center_half_size(center: Vec2, half_size: Vec2) -> Self {
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// Creates bounds from two corner points, automatically ordering them
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Checks that min is strictly below max on both axes
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }

    /// Tests if a point is contained within the bounds
    ///
    /// Points on the boundary are considered contained
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Tests if this bounds touches another.
    ///
    /// Shared edges and corners count as touching.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Clamps a point to be within the bounds
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Squared distance from a point to the closest point of the bounds.
    ///
    /// Returns 0 if the point is inside the bounds
    pub fn distance_squared_to_point(&self, point: Vec2) -> f32 {
        let clamped = self.clamp_point(point);
        (point - clamped).length_squared()
    }

    /// Splits the bounds into four equal quadrants.
    ///
    /// Quadrant indices match [`quadrant_of`](Self::quadrant_of): bit 0 is set
    /// for the half with larger x, bit 1 for the half with larger y.
    pub fn quadrants(&self) -> [Self; 4] {
        let center = self.center();
        [
            Self::new(self.min, center),
            Self::new(
                Vec2::new(center.x, self.min.y),
                Vec2::new(self.max.x, center.y),
            ),
            Self::new(
                Vec2::new(self.min.x, center.y),
                Vec2::new(center.x, self.max.y),
            ),
            Self::new(center, self.max),
        ]
    }

    /// Index of the quadrant that owns `point`.
    ///
    /// Quadrants are half-open: a point on the center line belongs to the
    /// quadrant on its larger side. Points outside the bounds are still
    /// assigned to the nearest-side quadrant; callers check containment first.
    pub fn quadrant_of(&self, point: Vec2) -> usize {
        let center = self.center();
        usize::from(point.x >= center.x) | (usize::from(point.y >= center.y) << 1)
    }
}

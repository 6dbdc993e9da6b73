//! Spatial structures for rejecting overlapping placements.
//!
//! - [`Aabb3`] / [`Segment3`] - exact geometry and intersection tests
//! - [`BoundingRecord`] - the stored geometry of one placed instance
//! - [`KdTree3D`] - incrementally built KD-tree with k-nearest queries
//! - [`CollisionIndex`] - records plus the tree that narrows candidates
//! - [`CollisionWorld`] - one index per geometry category
//!
//! The tree only prunes: it returns the records *near* a query point, and
//! the exact test in [`BoundingRecord::overlaps`] decides whether two
//! placements collide.
//!
//! # Example
//!
//! ```
//! use sylva_spatial::{BoundingRecord, Category, CollisionIndex, Segment3};
//! use glam::Vec3;
//!
//! let mut index = CollisionIndex::new(Category::Branch);
//! let trunk = Segment3::new(Vec3::ZERO, Vec3::Y);
//! index.add(BoundingRecord::Segment(trunk), &[trunk.midpoint()]);
//!
//! let crossing = Segment3::new(Vec3::new(-0.5, 0.5, 0.0), Vec3::new(0.5, 0.5, 0.0));
//! let hit = index.find_collision(&BoundingRecord::Segment(crossing), crossing.midpoint(), 5, 0.015);
//! assert!(hit.is_some());
//! ```

use glam::Vec3;
use std::cmp::Ordering;

mod collision;
mod kdtree;

pub use collision::{Category, CollisionIndex, CollisionWorld, RecordId, SpatialError};
pub use kdtree::KdTree3D;

// ============================================================================
// Geometry
// ============================================================================

/// 3D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Creates a new AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from center and half-extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB containing both points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Returns the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Grows the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Checks if this AABB contains a point.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Checks if this AABB intersects another AABB. Touching faces count.
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }
}

/// Below this the two segments are treated as parallel.
const PARALLEL_EPSILON: f32 = 0.0001;

/// Numerators smaller than this snap the closest-point parameter to zero.
const PARAMETER_EPSILON: f32 = 0.00001;

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment3 {
    /// First endpoint.
    pub start: Vec3,
    /// Second endpoint.
    pub end: Vec3,
}

impl Segment3 {
    /// Creates a segment between two points.
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Point halfway along the segment.
    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// Length of the segment.
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Shortest distance between any point of `self` and any point of `other`.
    ///
    /// Finds the closest points on the two supporting lines and clamps each
    /// parameter to its segment, re-solving the other parameter when an
    /// endpoint edge becomes the closest feature.
    pub fn closest_distance(&self, other: &Segment3) -> f32 {
        let u = self.end - self.start;
        let v = other.end - other.start;
        let w = self.start - other.start;

        let a = u.dot(u);
        let b = u.dot(v);
        let c = v.dot(v);
        let d = u.dot(w);
        let e = v.dot(w);

        let det = a * c - b * b;
        let (mut s_num, mut s_den) = (0.0, det);
        let mut t_num;
        let mut t_den = det;

        if det < PARALLEL_EPSILON {
            // Pin to the start of `self` and project onto `other`.
            s_den = 1.0;
            t_num = e;
            t_den = c;
        } else {
            s_num = b * e - c * d;
            t_num = a * e - b * d;
            if s_num < 0.0 {
                s_num = 0.0;
                t_num = e;
                t_den = c;
            } else if s_num > s_den {
                s_num = s_den;
                t_num = e + b;
                t_den = c;
            }
        }

        if t_num < 0.0 {
            t_num = 0.0;
            if -d < 0.0 {
                s_num = 0.0;
            } else if -d > a {
                s_num = s_den;
            } else {
                s_num = -d;
                s_den = a;
            }
        } else if t_num > t_den {
            t_num = t_den;
            if -d + b < 0.0 {
                s_num = 0.0;
            } else if -d + b > a {
                s_num = s_den;
            } else {
                s_num = -d + b;
                s_den = a;
            }
        }

        let s = if s_num.abs() < PARAMETER_EPSILON {
            0.0
        } else {
            s_num / s_den
        };
        let t = if t_num.abs() < PARAMETER_EPSILON {
            0.0
        } else {
            t_num / t_den
        };

        (w + u * s - v * t).length()
    }

    /// Slab test against a box.
    pub fn intersects_aabb(&self, aabb: &Aabb3) -> bool {
        let dir = self.end - self.start;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for axis in 0..3 {
            let origin = self.start[axis];
            let delta = dir[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

            if delta.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / delta;
            let (mut t0, mut t1) = ((lo - origin) * inv, (hi - origin) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }

        true
    }
}

/// Approximate swept volume of one placed instance.
///
/// Records are append-only: once stored in a [`CollisionIndex`] they are
/// never changed or removed until the index is cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundingRecord {
    /// Axis-aligned box in world space.
    Aabb(Aabb3),
    /// Line segment along the instance's axis.
    Segment(Segment3),
}

impl BoundingRecord {
    /// Representative point used for index anchors.
    pub fn center(&self) -> Vec3 {
        match self {
            BoundingRecord::Aabb(aabb) => aabb.center(),
            BoundingRecord::Segment(segment) => segment.midpoint(),
        }
    }

    /// Exact collision test.
    ///
    /// Boxes collide when they overlap. Segments collide when their closest
    /// distance is below `epsilon`. A segment and a box collide when the
    /// segment enters the box grown by `epsilon`.
    pub fn overlaps(&self, other: &BoundingRecord, epsilon: f32) -> bool {
        match (self, other) {
            (BoundingRecord::Aabb(a), BoundingRecord::Aabb(b)) => a.intersects(b),
            (BoundingRecord::Segment(a), BoundingRecord::Segment(b)) => {
                a.closest_distance(b) < epsilon
            }
            (BoundingRecord::Aabb(aabb), BoundingRecord::Segment(segment))
            | (BoundingRecord::Segment(segment), BoundingRecord::Aabb(aabb)) => {
                segment.intersects_aabb(&aabb.expanded(epsilon))
            }
        }
    }
}

// ============================================================================
// K-nearest helpers
// ============================================================================

/// Candidate for k-nearest search (used in binary heap).
#[derive(Debug)]
pub(crate) struct KNearestCandidate3D<'a, T> {
    pub position: Vec3,
    pub data: &'a T,
    /// Squared distance to the query point.
    pub distance: f32,
}

impl<T> PartialEq for KNearestCandidate3D<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl<T> Eq for KNearestCandidate3D<'_, T> {}

impl<T> PartialOrd for KNearestCandidate3D<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for KNearestCandidate3D<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: larger distance = higher priority
        self.distance.total_cmp(&other.distance)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb3_intersects() {
        let a = Aabb3::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb3::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let c = Aabb3::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb3_touching_faces_intersect() {
        let a = Aabb3::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb3::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_aabb3_from_points_orders_corners() {
        let aabb = Aabb3::from_points(Vec3::new(1.0, -1.0, 2.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 2.0));
        assert!(aabb.contains_point(Vec3::ZERO));
    }

    #[test]
    fn test_segment_crossing_distance_is_zero() {
        let a = Segment3::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let b = Segment3::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(a.closest_distance(&b) < 1e-6);
    }

    #[test]
    fn test_segment_skew_distance() {
        let a = Segment3::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let b = Segment3::new(Vec3::new(0.0, -1.0, 2.0), Vec3::new(0.0, 1.0, 2.0));
        assert!((a.closest_distance(&b) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_segment_parallel_distance() {
        let a = Segment3::new(Vec3::ZERO, Vec3::Y);
        let b = Segment3::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.5, 1.0, 0.0));
        assert!((a.closest_distance(&b) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_segment_endpoint_clamping() {
        // Supporting lines cross at the origin, but the segments stop short of it.
        let a = Segment3::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let b = Segment3::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        assert!((a.closest_distance(&b) - 2.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_segment_distance_is_symmetric() {
        let a = Segment3::new(Vec3::new(0.1, 0.2, 0.3), Vec3::new(1.4, -0.5, 0.9));
        let b = Segment3::new(Vec3::new(-0.7, 1.1, 0.0), Vec3::new(0.6, 0.3, -1.2));
        assert!((a.closest_distance(&b) - b.closest_distance(&a)).abs() < 1e-5);
    }

    #[test]
    fn test_segment_intersects_aabb() {
        let aabb = Aabb3::new(Vec3::ZERO, Vec3::ONE);
        let through = Segment3::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(2.0, 0.5, 0.5));
        let beside = Segment3::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(2.0, 2.0, 0.5));
        let inside = Segment3::new(Vec3::splat(0.25), Vec3::splat(0.75));
        assert!(through.intersects_aabb(&aabb));
        assert!(!beside.intersects_aabb(&aabb));
        assert!(inside.intersects_aabb(&aabb));
    }

    #[test]
    fn test_record_overlaps() {
        let segment = BoundingRecord::Segment(Segment3::new(Vec3::ZERO, Vec3::Y));
        let near = BoundingRecord::Segment(Segment3::new(
            Vec3::new(0.01, 0.0, 0.0),
            Vec3::new(0.01, 1.0, 0.0),
        ));
        let far = BoundingRecord::Segment(Segment3::new(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.5, 1.0, 0.0),
        ));
        assert!(segment.overlaps(&near, 0.015));
        assert!(!segment.overlaps(&far, 0.015));

        let aabb = BoundingRecord::Aabb(Aabb3::new(
            Vec3::new(0.005, 0.4, -0.1),
            Vec3::new(0.2, 0.6, 0.1),
        ));
        assert!(segment.overlaps(&aabb, 0.015));
        assert!(aabb.overlaps(&segment, 0.015));
    }
}

//! Per-category collision indices.

use std::fmt;

use glam::Vec3;
use thiserror::Error;

use crate::{BoundingRecord, KdTree3D};

/// Geometry category an index is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Branch segments.
    Branch,
    /// Leaf boxes.
    Leaf,
}

/// Stable identity of a stored [`BoundingRecord`].
///
/// The category is part of the identity, so an id handed out by one index
/// can never be mistaken for a record of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    category: Category,
    index: u32,
}

impl RecordId {
    /// Category of the index that issued this id.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Position in the issuing index's record sequence.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.category, self.index)
    }
}

/// Errors from misuse of a [`CollisionIndex`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpatialError {
    /// The id was issued by an index of another category.
    #[error("record {id} does not belong to the {expected:?} index")]
    ForeignRecord {
        /// The offending id.
        id: RecordId,
        /// Category of the index it was given to.
        expected: Category,
    },

    /// The id points past the end of the record sequence.
    #[error("record {0} was never stored")]
    UnknownRecord(RecordId),
}

/// Append-only store of bounding records plus a KD-tree of anchor points.
///
/// A record may be anchored at several points (midpoint and endpoints of a
/// branch, say) so that queries near any part of it find it. Queries return
/// record ids; callers run the exact test on the records themselves.
#[derive(Debug, Clone)]
pub struct CollisionIndex {
    category: Category,
    records: Vec<BoundingRecord>,
    tree: KdTree3D<RecordId>,
}

impl CollisionIndex {
    /// Creates an empty index for one category.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            records: Vec::new(),
            tree: KdTree3D::new(),
        }
    }

    /// Category this index stores.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Appends a record without anchoring it.
    pub fn push_record(&mut self, record: BoundingRecord) -> RecordId {
        let id = RecordId {
            category: self.category,
            index: self.records.len() as u32,
        };
        self.records.push(record);
        id
    }

    /// Anchors an existing record at a point.
    pub fn insert(&mut self, id: RecordId, point: Vec3) -> Result<(), SpatialError> {
        if id.category != self.category {
            return Err(SpatialError::ForeignRecord {
                id,
                expected: self.category,
            });
        }
        if id.index() >= self.records.len() {
            return Err(SpatialError::UnknownRecord(id));
        }
        self.tree.insert(point, id);
        Ok(())
    }

    /// Appends a record and anchors it at each of `anchors`.
    pub fn add(&mut self, record: BoundingRecord, anchors: &[Vec3]) -> RecordId {
        let id = self.push_record(record);
        for &anchor in anchors {
            self.tree.insert(anchor, id);
        }
        id
    }

    /// Up to `k` anchors nearest to `point`, as `(id, squared distance)`
    /// ascending by distance. A record anchored several times may appear
    /// more than once.
    pub fn nearest(&self, point: Vec3, k: usize) -> Vec<(RecordId, f32)> {
        self.tree
            .k_nearest(point, k)
            .into_iter()
            .map(|(_, &id, dist_sq)| (id, dist_sq))
            .collect()
    }

    /// The stored record for an id, if this index issued it.
    pub fn record(&self, id: RecordId) -> Option<&BoundingRecord> {
        if id.category != self.category {
            return None;
        }
        self.records.get(id.index())
    }

    /// All stored records, in insertion order.
    pub fn records(&self) -> &[BoundingRecord] {
        &self.records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of anchor points in the tree.
    pub fn anchor_count(&self) -> usize {
        self.tree.len()
    }

    /// Forgets every record and anchor.
    pub fn clear(&mut self) {
        self.records.clear();
        self.tree.clear();
    }

    /// First stored record among the `k` anchors nearest to `query` that
    /// overlaps `candidate`.
    ///
    /// Neighbours whose record cannot be found are logged and skipped.
    pub fn find_collision(
        &self,
        candidate: &BoundingRecord,
        query: Vec3,
        k: usize,
        epsilon: f32,
    ) -> Option<RecordId> {
        for (id, _) in self.nearest(query, k) {
            let Some(existing) = self.record(id) else {
                log::error!("collision index returned {id} but no bounding record is stored");
                continue;
            };
            if candidate.overlaps(existing, epsilon) {
                return Some(id);
            }
        }
        None
    }
}

/// Collision state for one generation run: a branch index and a leaf index.
#[derive(Debug, Clone)]
pub struct CollisionWorld {
    /// Branch segments.
    pub branches: CollisionIndex,
    /// Leaf boxes.
    pub leaves: CollisionIndex,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionWorld {
    /// Creates empty indices.
    pub fn new() -> Self {
        Self {
            branches: CollisionIndex::new(Category::Branch),
            leaves: CollisionIndex::new(Category::Leaf),
        }
    }

    /// Empties both indices for a fresh run.
    pub fn reset(&mut self) {
        self.branches.clear();
        self.leaves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aabb3, Segment3};

    fn branch(start: Vec3, end: Vec3) -> BoundingRecord {
        BoundingRecord::Segment(Segment3::new(start, end))
    }

    #[test]
    fn test_own_record_is_nearest() {
        let mut index = CollisionIndex::new(Category::Branch);
        let record = branch(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 3.0, 3.0));
        let id = index.add(record, &[record.center()]);

        let nearest = index.nearest(record.center(), 5);
        assert_eq!(nearest[0].0, id);
        assert!(nearest[0].1 < 1e-8);
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut index = CollisionIndex::new(Category::Branch);
        let a = index.push_record(branch(Vec3::ZERO, Vec3::Y));
        let b = index.push_record(branch(Vec3::X, Vec3::ONE));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.anchor_count(), 0);
    }

    #[test]
    fn test_insert_rejects_foreign_ids() {
        let mut branches = CollisionIndex::new(Category::Branch);
        let mut leaves = CollisionIndex::new(Category::Leaf);
        let leaf = leaves.push_record(BoundingRecord::Aabb(Aabb3::new(Vec3::ZERO, Vec3::ONE)));

        assert_eq!(
            branches.insert(leaf, Vec3::ZERO),
            Err(SpatialError::ForeignRecord {
                id: leaf,
                expected: Category::Branch,
            })
        );
        assert!(branches.record(leaf).is_none());
    }

    #[test]
    fn test_insert_rejects_unknown_ids() {
        let mut other = CollisionIndex::new(Category::Branch);
        let _ = other.push_record(branch(Vec3::ZERO, Vec3::Y));
        let stale = other.push_record(branch(Vec3::ZERO, Vec3::Y));

        let mut index = CollisionIndex::new(Category::Branch);
        index.push_record(branch(Vec3::ZERO, Vec3::Y));
        assert_eq!(
            index.insert(stale, Vec3::ZERO),
            Err(SpatialError::UnknownRecord(stale))
        );
    }

    #[test]
    fn test_multiple_anchors_share_an_id() {
        let mut index = CollisionIndex::new(Category::Branch);
        let segment = Segment3::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));
        let id = index.add(
            BoundingRecord::Segment(segment),
            &[segment.midpoint(), segment.start, segment.end],
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.anchor_count(), 3);
        assert!(index.nearest(Vec3::Y, 3).iter().all(|(hit, _)| *hit == id));
    }

    #[test]
    fn test_find_collision_uses_exact_test() {
        let mut index = CollisionIndex::new(Category::Branch);
        let trunk = Segment3::new(Vec3::ZERO, Vec3::Y);
        index.add(BoundingRecord::Segment(trunk), &[trunk.midpoint()]);

        // Anchors are close, but the segments are parallel and 0.1 apart.
        let beside = branch(Vec3::new(0.1, 0.0, 0.0), Vec3::new(0.1, 1.0, 0.0));
        assert_eq!(
            index.find_collision(&beside, beside.center(), 20, 0.015),
            None
        );

        let touching = branch(Vec3::new(0.0, 0.5, 0.0), Vec3::new(1.0, 0.5, 0.0));
        assert!(
            index
                .find_collision(&touching, touching.center(), 20, 0.015)
                .is_some()
        );
    }

    #[test]
    fn test_world_reset() {
        let mut world = CollisionWorld::new();
        world.branches.add(branch(Vec3::ZERO, Vec3::Y), &[Vec3::ZERO]);
        world.leaves.add(
            BoundingRecord::Aabb(Aabb3::new(Vec3::ZERO, Vec3::ONE)),
            &[Vec3::splat(0.5)],
        );
        world.reset();
        assert!(world.branches.is_empty());
        assert!(world.leaves.is_empty());
        assert_eq!(world.branches.anchor_count(), 0);
    }
}

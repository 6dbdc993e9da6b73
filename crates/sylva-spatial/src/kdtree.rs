use std::collections::BinaryHeap;

use glam::Vec3;

use crate::KNearestCandidate3D;

// ============================================================================
// KD-Tree (3D)
// ============================================================================

/// A point with associated data stored in a 3D KD-tree.
#[derive(Debug, Clone)]
struct KdEntry3D<T> {
    position: Vec3,
    data: T,
}

/// A node in the 3D KD-tree.
#[derive(Debug, Clone)]
enum KdNode3D<T> {
    /// No point stored here yet.
    Empty,
    /// A stored point that also splits space along `axis`.
    Split {
        entry: KdEntry3D<T>,
        /// Split dimension (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Points with `position[axis]` below the split.
        left: Box<KdNode3D<T>>,
        /// Points at or above the split.
        right: Box<KdNode3D<T>>,
    },
}

impl<T> KdNode3D<T> {
    /// Moves both children of a split node onto `pending`, leaving it a leaf.
    fn detach_children(&mut self, pending: &mut Vec<KdNode3D<T>>) {
        if let KdNode3D::Split { left, right, .. } = self {
            pending.push(std::mem::replace(left.as_mut(), KdNode3D::Empty));
            pending.push(std::mem::replace(right.as_mut(), KdNode3D::Empty));
        }
    }
}

impl<T> Drop for KdNode3D<T> {
    // Unbalanced trees can be thousands of nodes deep; drop without recursion.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

/// A 3D KD-tree that grows one point at a time.
///
/// Every inserted point becomes a splitting node, cycling the split axis with
/// depth. There is no rebalancing: insertion order decides the shape, which
/// only affects query speed, never the answers.
///
/// Distances reported by queries are **squared** Euclidean distances.
///
/// # Example
///
/// ```
/// use sylva_spatial::KdTree3D;
/// use glam::Vec3;
///
/// let mut tree = KdTree3D::new();
/// tree.insert(Vec3::new(10.0, 10.0, 10.0), "A");
/// tree.insert(Vec3::new(20.0, 20.0, 20.0), "B");
/// tree.insert(Vec3::new(50.0, 50.0, 50.0), "C");
///
/// let (_, data, dist_sq) = tree.nearest(Vec3::new(12.0, 12.0, 12.0)).unwrap();
/// assert_eq!(*data, "A");
/// assert_eq!(dist_sq, 12.0);
/// ```
#[derive(Debug, Clone)]
pub struct KdTree3D<T> {
    root: KdNode3D<T>,
    len: usize,
}

impl<T> Default for KdTree3D<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KdTree3D<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: KdNode3D::Empty,
            len: 0,
        }
    }

    /// Builds a tree from a batch of points, inserting medians first so the
    /// result is close to balanced.
    pub fn build(points: Vec<(Vec3, T)>) -> Self {
        let mut tree = Self::new();
        tree.insert_medians(points, 0);
        tree
    }

    fn insert_medians(&mut self, mut points: Vec<(Vec3, T)>, depth: usize) {
        if points.is_empty() {
            return;
        }
        let axis = depth % 3;
        points.sort_by(|a, b| a.0[axis].total_cmp(&b.0[axis]));

        let mut upper = points.split_off(points.len() / 2);
        let (position, data) = upper.remove(0);
        self.insert(position, data);

        self.insert_medians(points, depth + 1);
        self.insert_medians(upper, depth + 1);
    }

    /// Inserts one point.
    ///
    /// Walks down iteratively, so a degenerate chain of any length is fine.
    pub fn insert(&mut self, position: Vec3, data: T) {
        let mut node = &mut self.root;
        let mut depth = 0;
        loop {
            match node {
                KdNode3D::Empty => {
                    *node = KdNode3D::Split {
                        entry: KdEntry3D { position, data },
                        axis: depth % 3,
                        left: Box::new(KdNode3D::Empty),
                        right: Box::new(KdNode3D::Empty),
                    };
                    break;
                }
                KdNode3D::Split {
                    entry,
                    axis,
                    left,
                    right,
                } => {
                    node = if position[*axis] < entry.position[*axis] {
                        left.as_mut()
                    } else {
                        right.as_mut()
                    };
                    depth += 1;
                }
            }
        }
        self.len += 1;
    }

    /// Returns the number of points in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every point.
    pub fn clear(&mut self) {
        self.root = KdNode3D::Empty;
        self.len = 0;
    }

    /// Finds the nearest point to the given position.
    ///
    /// Returns `None` if the tree is empty.
    pub fn nearest(&self, position: Vec3) -> Option<(Vec3, &T, f32)> {
        self.k_nearest(position, 1).into_iter().next()
    }

    /// Finds the k nearest points to the given position.
    ///
    /// Returns up to k points, sorted by squared distance (closest first).
    pub fn k_nearest(&self, position: Vec3, k: usize) -> Vec<(Vec3, &T, f32)> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<KNearestCandidate3D<'_, T>> = BinaryHeap::with_capacity(k + 1);
        // Pending subtrees with the squared distance to their splitting plane.
        // The near side is pushed last so it is searched first.
        let mut pending: Vec<(&KdNode3D<T>, Option<f32>)> = vec![(&self.root, None)];

        while let Some((node, plane_dist_sq)) = pending.pop() {
            let KdNode3D::Split {
                entry,
                axis,
                left,
                right,
            } = node
            else {
                continue;
            };

            let must_visit = match plane_dist_sq {
                None => true,
                Some(plane) => {
                    heap.len() < k || heap.peek().is_some_and(|worst| plane < worst.distance)
                }
            };
            if !must_visit {
                continue;
            }

            let candidate = KNearestCandidate3D {
                position: entry.position,
                data: &entry.data,
                distance: entry.position.distance_squared(position),
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap
                .peek()
                .is_some_and(|worst| candidate.distance < worst.distance)
            {
                heap.pop();
                heap.push(candidate);
            }

            let offset = position[*axis] - entry.position[*axis];
            let (near, far) = if offset < 0.0 {
                (left.as_ref(), right.as_ref())
            } else {
                (right.as_ref(), left.as_ref())
            };
            pending.push((far, Some(offset * offset)));
            pending.push((near, None));
        }

        let mut results: Vec<_> = heap
            .into_iter()
            .map(|c| (c.position, c.data, c.distance))
            .collect();
        results.sort_by(|a, b| a.2.total_cmp(&b.2));
        results
    }
}

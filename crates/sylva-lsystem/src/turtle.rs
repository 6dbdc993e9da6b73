//! Turtle state and the save/restore stack.

use glam::{Mat4, Vec3, Vec4};

/// Position, heading and accumulated frame of the turtle.
///
/// `position` and `heading` are homogeneous: w = 1 for the point, w = 0 for
/// the direction. `transform` maps the turtle's local frame to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleState {
    /// Current position (w = 1).
    pub position: Vec4,
    /// Unit heading (w = 0).
    pub heading: Vec4,
    /// Chain of every transform applied so far.
    pub transform: Mat4,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            heading: Vec4::new(0.0, 1.0, 0.0, 0.0), // Forward is +Y
            transform: Mat4::IDENTITY,
        }
    }
}

impl TurtleState {
    /// Creates a turtle at the origin heading up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composes an incremental transform onto the turtle.
    ///
    /// Position and heading are multiplied by `m`, the heading is
    /// renormalized and `m` is appended on the right of the accumulated
    /// transform.
    pub fn apply_transform(&mut self, m: Mat4) {
        self.position = m * self.position;
        self.heading = (m * self.heading).normalize_or_zero();
        self.transform *= m;

        log::trace!(
            "turtle heading ({:.4}, {:.4}, {:.4}) position ({:.4}, {:.4}, {:.4})",
            self.heading.x,
            self.heading.y,
            self.heading.z,
            self.position.x,
            self.position.y,
            self.position.z
        );
    }

    /// Maps a point in the turtle's local frame to world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.transform.transform_point3(local)
    }

    /// World-space origin of the turtle's local frame.
    pub fn world_origin(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Position as a 3D point.
    pub fn position3(&self) -> Vec3 {
        self.position.truncate()
    }
}

/// One saved turtle snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackEntry {
    /// The saved state.
    pub turtle: TurtleState,
}

/// LIFO stack of turtle snapshots.
///
/// Entries are copies: mutating the live turtle never reaches a saved one.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStack {
    entries: Vec<StackEntry>,
}

impl ExecutionStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a copy of `turtle`.
    pub fn push(&mut self, turtle: &TurtleState) {
        log::trace!(
            "saving state ({:.4}, {:.4}, {:.4})",
            turtle.position.x,
            turtle.position.y,
            turtle.position.z
        );
        self.entries.push(StackEntry { turtle: *turtle });
    }

    /// Removes and returns the most recent snapshot.
    pub fn pop(&mut self) -> Option<TurtleState> {
        let entry = self.entries.pop()?;
        log::trace!(
            "restoring state ({:.4}, {:.4}, {:.4})",
            entry.turtle.position.x,
            entry.turtle.position.y,
            entry.turtle.position.z
        );
        Some(entry.turtle)
    }

    /// The most recent snapshot, if any.
    pub fn peek(&self) -> Option<&TurtleState> {
        self.entries.last().map(|entry| &entry.turtle)
    }

    /// Number of saved snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

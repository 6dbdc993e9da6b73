//! Output sinks and environmental parameters handed to a run.

use glam::{Mat4, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Environmental parameters read by the operations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Influencers {
    /// How strongly branches bend toward the sun.
    pub sunlight: f32,
    /// How strongly branches droop, scaled further by nesting depth.
    pub gravity: f32,
    /// Whether branch placements are tested against earlier branches.
    pub collision_check: bool,
}

impl Default for Influencers {
    fn default() -> Self {
        Self {
            sunlight: 0.0,
            gravity: 0.1,
            collision_check: true,
        }
    }
}

impl Influencers {
    /// Sets the sunlight influence.
    pub fn with_sunlight(mut self, sunlight: f32) -> Self {
        self.sunlight = sunlight;
        self
    }

    /// Sets the gravity influence.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Enables or disables branch collision checks.
    pub fn with_collision_check(mut self, enabled: bool) -> Self {
        self.collision_check = enabled;
        self
    }
}

/// Collects placement transforms for one instanced mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceBuffer {
    transforms: Vec<Mat4>,
}

impl InstanceBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one instance.
    pub fn add_instance(&mut self, transform: Mat4) {
        self.transforms.push(transform);
    }

    /// Recorded transforms, in emission order.
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Drops every instance.
    pub fn clear(&mut self) {
        self.transforms.clear();
    }
}

/// Collects debug line segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBuffer {
    lines: Vec<[Vec3; 2]>,
}

impl LineBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one segment.
    pub fn add_line(&mut self, start: Vec3, end: Vec3) {
        self.lines.push([start, end]);
    }

    /// Recorded segments.
    pub fn lines(&self) -> &[[Vec3; 2]] {
        &self.lines
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drops every segment.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Everything a run reads from and writes to outside the turtle.
///
/// The host fills in the sinks it wants before a run and reads them back
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// Branch mesh instances.
    pub branch: InstanceBuffer,
    /// Leaf mesh instances, one buffer per variant along the leaf gradient.
    /// Leaves are dropped when this is empty.
    pub leaves: Vec<InstanceBuffer>,
    /// Receives one segment per accepted branch when present.
    pub bounding_lines: Option<LineBuffer>,
    /// Environmental parameters.
    pub influencers: Influencers,
    /// Unit direction toward the sun.
    pub sun_direction: Vec3,
    /// Placements rejected by collision checks.
    pub collision_count: u32,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            branch: InstanceBuffer::new(),
            leaves: Vec::new(),
            bounding_lines: None,
            influencers: Influencers::default(),
            sun_direction: Vec3::splat(20.0).normalize(),
            collision_count: 0,
        }
    }
}

impl Scope {
    /// Creates a scope with no leaf variants and no line sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides `count` empty leaf variant buffers.
    pub fn with_leaf_variants(mut self, count: usize) -> Self {
        self.leaves = vec![InstanceBuffer::new(); count];
        self
    }

    /// Enables the bounding line sink.
    pub fn with_bounding_lines(mut self) -> Self {
        self.bounding_lines = Some(LineBuffer::new());
        self
    }

    /// Sets the environmental parameters.
    pub fn with_influencers(mut self, influencers: Influencers) -> Self {
        self.influencers = influencers;
        self
    }

    /// Sets the sun direction. Zero vectors are kept as zero.
    pub fn with_sun_direction(mut self, direction: Vec3) -> Self {
        self.sun_direction = direction.normalize_or_zero();
        self
    }

    /// Total leaf instances across every variant.
    pub fn leaf_count(&self) -> usize {
        self.leaves.iter().map(InstanceBuffer::len).sum()
    }

    /// Empties every sink and resets the collision count, keeping the
    /// configuration and the set of sinks.
    pub fn clear_outputs(&mut self) {
        self.branch.clear();
        for leaves in &mut self.leaves {
            leaves.clear();
        }
        if let Some(lines) = &mut self.bounding_lines {
            lines.clear();
        }
        self.collision_count = 0;
    }
}

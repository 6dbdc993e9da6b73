//! Turtle operations bound to symbols.
//!
//! Operations are serializable structs with `apply` methods, one per kind of
//! symbol behavior. [`Operation`] is the closed set a binding can hold.

use glam::{Mat4, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sylva_spatial::{Aabb3, BoundingRecord, Segment3};

use crate::error::Result;
use crate::interpreter::ExecutionContext;

/// Something a bound symbol does to the execution context.
pub trait TurtleOp {
    /// Runs the operation for the symbol at `ctx.index`.
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()>;
}

/// Places one branch instance and walks the turtle to its tip.
///
/// Length and thickness fall off with the square and the inverse of
/// `depth * depth_falloff`; shallow branches use fixed sizes instead.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DrawBranch {
    /// Multiplier turning nesting depth into the falloff factor.
    pub depth_falloff: f32,
    /// Length numerator for deep branches.
    pub base_travel: f32,
    /// Thickness numerator for deep branches.
    pub base_scale: f32,
    /// Branches at this depth or shallower use the fixed sizes below.
    pub shallow_depth: u32,
    /// Length of shallow branches.
    pub shallow_travel: f32,
    /// Thickness of shallow branches.
    pub shallow_scale: f32,
    /// Branches starting below this world height are dropped.
    pub min_height: f32,
    /// Gap between the branch base and the start of its collision segment.
    pub segment_inset: f32,
    /// Fraction of the length covered by the collision segment's end.
    pub segment_reach: f32,
    /// Earlier branches inspected per placement.
    pub neighbors: usize,
    /// Segments closer than this collide.
    pub clearance: f32,
}

impl Default for DrawBranch {
    fn default() -> Self {
        Self {
            depth_falloff: 0.45,
            base_travel: 1.0,
            base_scale: 0.1,
            shallow_depth: 2,
            shallow_travel: 0.4,
            shallow_scale: 0.1,
            min_height: 0.0,
            segment_inset: 0.05,
            segment_reach: 0.95,
            neighbors: 20,
            clearance: 0.015,
        }
    }
}

impl DrawBranch {
    /// Sets the collision clearance.
    pub fn with_clearance(mut self, clearance: f32) -> Self {
        self.clearance = clearance;
        self
    }

    /// Sets how many earlier branches are inspected per placement.
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Length and thickness of a branch drawn at `depth`.
    pub fn dimensions(&self, depth: u32) -> (f32, f32) {
        if depth <= self.shallow_depth {
            return (self.shallow_travel, self.shallow_scale);
        }
        let factor = depth as f32 * self.depth_falloff;
        (self.base_travel / (factor * factor), self.base_scale / factor)
    }
}

impl TurtleOp for DrawBranch {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let (travel, scale) = self.dimensions(ctx.depth);
        let advance = Mat4::from_translation(Vec3::new(0.0, travel, 0.0));
        let origin = ctx.turtle.world_origin();

        if origin.y < self.min_height {
            log::trace!("branch at symbol {} starts below ground", ctx.index);
            ctx.summary.ground_rejections += 1;
            ctx.turtle.apply_transform(advance);
            return Ok(());
        }

        if ctx.scope.influencers.collision_check {
            let mid = ctx.turtle.local_to_world(Vec3::new(0.0, 0.5 * travel, 0.0));
            let dir = (mid - origin).normalize_or_zero();
            let segment = Segment3::new(
                origin + dir * self.segment_inset,
                origin + dir * (self.segment_reach * travel),
            );
            let record = BoundingRecord::Segment(segment);

            if let Some(hit) =
                ctx.collisions
                    .branches
                    .find_collision(&record, mid, self.neighbors, self.clearance)
            {
                log::trace!("branch at symbol {} collides with {hit}", ctx.index);
                ctx.scope.collision_count += 1;
                ctx.summary.collisions += 1;
                return Ok(());
            }

            ctx.collisions
                .branches
                .add(record, &[mid, segment.start, segment.end]);
            if let Some(lines) = &mut ctx.scope.bounding_lines {
                lines.add_line(segment.start, segment.end);
            }
        }

        ctx.scope
            .branch
            .add_instance(ctx.turtle.transform * Mat4::from_scale(Vec3::new(scale, travel, scale)));
        ctx.summary.branches_placed += 1;
        ctx.turtle.apply_transform(advance);
        Ok(())
    }
}

/// Places one leaf instance on the current frame.
///
/// The variant is picked along the scope's leaf gradient from noise at the
/// turtle position. Leaves with no deeper leaf ahead of them in the string
/// take the last variant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DrawLeaf {
    /// Leaves shallower than this are skipped.
    pub min_depth: u32,
    /// Roll of the leaf about local Z, in degrees.
    pub angle: f32,
    /// Uniform leaf size.
    pub scale: f32,
    /// Leaves placed below this world height are dropped.
    pub min_height: f32,
    /// Spatial frequency of the variant noise.
    pub variant_frequency: f32,
    /// When set, leaves whose boxes of this edge length overlap an earlier
    /// leaf are rejected.
    pub min_spacing: Option<f32>,
    /// Earlier leaves inspected per placement when spacing is enforced.
    pub neighbors: usize,
}

impl Default for DrawLeaf {
    fn default() -> Self {
        Self {
            min_depth: 3,
            angle: 33.0,
            scale: 0.3,
            min_height: 1.0,
            variant_frequency: 23.0,
            min_spacing: None,
            neighbors: 20,
        }
    }
}

impl DrawLeaf {
    /// Rejects leaves closer than `spacing` to an earlier leaf.
    pub fn with_min_spacing(mut self, spacing: f32) -> Self {
        self.min_spacing = Some(spacing);
        self
    }

    /// Sets the minimum depth at which leaves appear.
    pub fn with_min_depth(mut self, depth: u32) -> Self {
        self.min_depth = depth;
        self
    }

    /// Maps signed noise onto `0..count`.
    fn variant_for(noise: f32, count: usize) -> usize {
        let last = count.saturating_sub(1);
        let t = ((noise + 1.0) / 2.0).clamp(0.0, 1.0);
        ((last as f32 * t).floor() as usize).min(last)
    }
}

impl TurtleOp for DrawLeaf {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        if ctx.depth < self.min_depth || ctx.scope.leaves.is_empty() {
            return Ok(());
        }

        let instance = ctx.turtle.transform
            * Mat4::from_rotation_z(self.angle.to_radians())
            * Mat4::from_scale(Vec3::splat(self.scale));
        let origin = instance.w_axis.truncate();

        if origin.y < self.min_height {
            ctx.summary.ground_rejections += 1;
            return Ok(());
        }

        if let Some(spacing) = self.min_spacing {
            let record =
                BoundingRecord::Aabb(Aabb3::from_center_half_extents(origin, Vec3::splat(spacing * 0.5)));
            if let Some(hit) = ctx
                .collisions
                .leaves
                .find_collision(&record, origin, self.neighbors, 0.0)
            {
                log::trace!("leaf at symbol {} overlaps {hit}", ctx.index);
                ctx.scope.collision_count += 1;
                ctx.summary.collisions += 1;
                return Ok(());
            }
            ctx.collisions.leaves.add(record, &[origin]);
        }

        let count = ctx.scope.leaves.len();
        let variant = if ctx.structure.deeper_leaf_ahead(ctx.index) {
            let noise = ctx
                .noise
                .perlin3_signed(ctx.turtle.position3() * self.variant_frequency);
            Self::variant_for(noise, count)
        } else {
            count - 1
        };

        ctx.scope.leaves[variant].add_instance(instance);
        ctx.summary.leaves_placed += 1;
        Ok(())
    }
}

/// `angle` plus noise jitter at the turtle position, in radians.
fn jittered(angle: f32, jitter: f32, ctx: &ExecutionContext<'_>) -> f32 {
    let noise = ctx.noise.perlin3(ctx.turtle.position3());
    (angle + jitter * (noise - 0.5) * 2.0).to_radians()
}

/// Turns the turtle about its local Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Rotate {
    /// Base angle in degrees.
    pub angle: f32,
    /// Largest noise offset added to the angle, in degrees.
    pub jitter: f32,
}

impl Default for Rotate {
    fn default() -> Self {
        Self {
            angle: 45.0,
            jitter: 5.0,
        }
    }
}

impl Rotate {
    /// Rotation by `angle` degrees with the default jitter.
    pub fn by(angle: f32) -> Self {
        Self {
            angle,
            ..Self::default()
        }
    }

    /// Sets the jitter.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }
}

impl TurtleOp for Rotate {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let radians = jittered(self.angle, self.jitter, ctx);
        ctx.turtle.apply_transform(Mat4::from_rotation_y(radians));
        Ok(())
    }
}

/// Tilts the turtle about its local Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Tilt {
    /// Base angle in degrees.
    pub angle: f32,
    /// Largest noise offset added to the angle, in degrees.
    pub jitter: f32,
}

impl Default for Tilt {
    fn default() -> Self {
        Self {
            angle: 20.0,
            jitter: 5.0,
        }
    }
}

impl Tilt {
    /// Tilt by `angle` degrees with the default jitter.
    pub fn by(angle: f32) -> Self {
        Self {
            angle,
            ..Self::default()
        }
    }

    /// Sets the jitter.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }
}

impl TurtleOp for Tilt {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let radians = jittered(self.angle, self.jitter, ctx);
        ctx.turtle.apply_transform(Mat4::from_rotation_z(radians));
        Ok(())
    }
}

/// Bends the turtle toward the sun and down under gravity.
///
/// Both rotations turn the heading about the normal of the plane spanned by
/// the heading and the pull direction. Gravity grows with nesting depth.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvironmentTick {
    /// Degrees per unit of sunlight influence.
    pub sun_angle: f32,
    /// Degrees per unit of gravity influence and depth.
    pub gravity_angle: f32,
}

impl Default for EnvironmentTick {
    fn default() -> Self {
        Self {
            sun_angle: 10.0,
            gravity_angle: 20.0,
        }
    }
}

/// Rotation about `axis`, or identity when the axis is degenerate.
fn pull_rotation(axis: Vec3, degrees: f32) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) if degrees != 0.0 => Mat4::from_axis_angle(axis, degrees.to_radians()),
        _ => Mat4::IDENTITY,
    }
}

impl TurtleOp for EnvironmentTick {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        let origin = ctx.turtle.world_origin();
        let mid = ctx.turtle.local_to_world(Vec3::new(0.0, 0.5, 0.0));
        let dir = (mid - origin).normalize_or_zero();
        let influencers = ctx.scope.influencers;

        let sun = pull_rotation(
            dir.cross(ctx.scope.sun_direction),
            self.sun_angle * influencers.sunlight,
        );
        let gravity = pull_rotation(
            dir.cross(Vec3::NEG_Y),
            self.gravity_angle * ctx.depth as f32 * influencers.gravity,
        );

        ctx.turtle.apply_transform(gravity * sun);
        Ok(())
    }
}

/// The closed set of behaviors a symbol can be bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation {
    /// Place a branch and advance.
    DrawBranch(DrawBranch),
    /// Place a leaf.
    DrawLeaf(DrawLeaf),
    /// Turn about local Y.
    Rotate(Rotate),
    /// Tilt about local Z.
    Tilt(Tilt),
    /// Save the turtle and open a nesting level.
    PushState,
    /// Restore the turtle and close a nesting level.
    PopState,
    /// Apply sun and gravity.
    EnvironmentTick(EnvironmentTick),
}

impl Operation {
    /// Branch drawing with default parameters.
    pub fn branch() -> Self {
        Self::DrawBranch(DrawBranch::default())
    }

    /// Leaf drawing with default parameters.
    pub fn leaf() -> Self {
        Self::DrawLeaf(DrawLeaf::default())
    }

    /// Turn by `angle` degrees.
    pub fn rotate(angle: f32) -> Self {
        Self::Rotate(Rotate::by(angle))
    }

    /// Tilt by `angle` degrees.
    pub fn tilt(angle: f32) -> Self {
        Self::Tilt(Tilt::by(angle))
    }

    /// Environment tick with default parameters.
    pub fn tick() -> Self {
        Self::EnvironmentTick(EnvironmentTick::default())
    }
}

impl TurtleOp for Operation {
    fn apply(&self, ctx: &mut ExecutionContext<'_>) -> Result<()> {
        match self {
            Operation::DrawBranch(op) => op.apply(ctx),
            Operation::DrawLeaf(op) => op.apply(ctx),
            Operation::Rotate(op) => op.apply(ctx),
            Operation::Tilt(op) => op.apply(ctx),
            Operation::PushState => {
                ctx.save_state();
                Ok(())
            }
            Operation::PopState => ctx.restore_state(),
            Operation::EnvironmentTick(op) => op.apply(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ExecutionContext;
    use crate::scope::Scope;
    use crate::structure::BranchStructure;
    use sylva_noise::NoiseSource;
    use sylva_spatial::CollisionWorld;

    struct Fixture {
        symbols: Vec<char>,
        structure: BranchStructure,
        noise: NoiseSource,
        scope: Scope,
        collisions: CollisionWorld,
    }

    impl Fixture {
        fn new(text: &str) -> Self {
            let symbols: Vec<char> = text.chars().collect();
            let structure =
                BranchStructure::analyze(&symbols, |c| c == '[', |c| c == ']', 'l', 1);
            Self {
                symbols,
                structure,
                noise: NoiseSource::new(7),
                scope: Scope::new().with_leaf_variants(3),
                collisions: CollisionWorld::new(),
            }
        }

        fn context(&mut self) -> ExecutionContext<'_> {
            ExecutionContext::new(
                &self.symbols,
                &self.structure,
                &self.noise,
                &mut self.scope,
                &mut self.collisions,
            )
        }
    }

    #[test]
    fn test_branch_dimensions() {
        let branch = DrawBranch::default();
        assert_eq!(branch.dimensions(1), (0.4, 0.1));
        assert_eq!(branch.dimensions(2), (0.4, 0.1));
        let (travel, scale) = branch.dimensions(3);
        let factor = 3.0 * 0.45;
        assert!((travel - 1.0 / (factor * factor)).abs() < 1e-6);
        assert!((scale - 0.1 / factor).abs() < 1e-6);
    }

    #[test]
    fn test_branch_advances_turtle() {
        let mut fixture = Fixture::new("D");
        let mut ctx = fixture.context();
        DrawBranch::default().apply(&mut ctx).unwrap();

        assert!((ctx.turtle.world_origin() - Vec3::new(0.0, 0.4, 0.0)).length() < 1e-6);
        assert_eq!(ctx.summary.branches_placed, 1);
        assert_eq!(ctx.scope.branch.len(), 1);
        assert_eq!(ctx.collisions.branches.len(), 1);
        assert_eq!(ctx.collisions.branches.anchor_count(), 3);
    }

    #[test]
    fn test_branch_emits_bounding_line() {
        let mut fixture = Fixture::new("D");
        fixture.scope = Scope::new().with_bounding_lines();
        let mut ctx = fixture.context();
        DrawBranch::default().apply(&mut ctx).unwrap();

        let lines = ctx.scope.bounding_lines.as_ref().unwrap();
        assert_eq!(lines.len(), 1);
        let [start, end] = lines.lines()[0];
        assert!((start - Vec3::new(0.0, 0.05, 0.0)).length() < 1e-6);
        assert!((end - Vec3::new(0.0, 0.38, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_branch_without_collision_check_skips_index() {
        let mut fixture = Fixture::new("D");
        fixture.scope.influencers.collision_check = false;
        let mut ctx = fixture.context();
        DrawBranch::default().apply(&mut ctx).unwrap();
        DrawBranch::default().apply(&mut ctx).unwrap();

        assert_eq!(ctx.scope.branch.len(), 2);
        assert!(ctx.collisions.branches.is_empty());
    }

    #[test]
    fn test_ground_rejection() {
        let mut fixture = Fixture::new("D");
        let mut ctx = fixture.context();
        ctx.turtle
            .apply_transform(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));
        DrawBranch::default().apply(&mut ctx).unwrap();

        assert!(ctx.scope.branch.is_empty());
        assert!(ctx.collisions.branches.is_empty());
        assert_eq!(ctx.summary.ground_rejections, 1);
        // The turtle still walks forward.
        assert!((ctx.turtle.world_origin().y - (-0.6)).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_branch_collides() {
        let mut fixture = Fixture::new("DD");
        let mut ctx = fixture.context();
        let start = ctx.turtle;
        DrawBranch::default().apply(&mut ctx).unwrap();

        // Same spot again: the candidate lies on the stored segment.
        ctx.turtle = start;
        DrawBranch::default().apply(&mut ctx).unwrap();

        assert_eq!(ctx.scope.branch.len(), 1);
        assert_eq!(ctx.scope.collision_count, 1);
        assert_eq!(ctx.summary.collisions, 1);
        // A colliding branch does not advance.
        assert_eq!(ctx.turtle, start);
    }

    #[test]
    fn test_leaf_needs_depth_and_height() {
        let mut fixture = Fixture::new("l");
        let mut ctx = fixture.context();
        DrawLeaf::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.scope.leaf_count(), 0);

        ctx.depth = 3;
        DrawLeaf::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.scope.leaf_count(), 0);
        assert_eq!(ctx.summary.ground_rejections, 1);

        ctx.turtle
            .apply_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        DrawLeaf::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.scope.leaf_count(), 1);
        assert_eq!(ctx.summary.leaves_placed, 1);
    }

    #[test]
    fn test_terminal_leaf_uses_last_variant() {
        let mut fixture = Fixture::new("l");
        let mut ctx = fixture.context();
        ctx.depth = 3;
        ctx.turtle
            .apply_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        DrawLeaf::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.scope.leaves[2].len(), 1);
    }

    #[test]
    fn test_leaf_spacing() {
        let mut fixture = Fixture::new("ll");
        let mut ctx = fixture.context();
        ctx.depth = 3;
        ctx.turtle
            .apply_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let leaf = DrawLeaf::default().with_min_spacing(0.5);
        leaf.apply(&mut ctx).unwrap();
        leaf.apply(&mut ctx).unwrap();

        assert_eq!(ctx.scope.leaf_count(), 1);
        assert_eq!(ctx.collisions.leaves.len(), 1);
        assert_eq!(ctx.scope.collision_count, 1);
    }

    #[test]
    fn test_variant_mapping() {
        assert_eq!(DrawLeaf::variant_for(-1.0, 4), 0);
        assert_eq!(DrawLeaf::variant_for(0.0, 4), 1);
        assert_eq!(DrawLeaf::variant_for(1.0, 4), 3);
        assert_eq!(DrawLeaf::variant_for(5.0, 4), 3);
        assert_eq!(DrawLeaf::variant_for(0.3, 1), 0);
    }

    #[test]
    fn test_rotate_without_jitter() {
        let mut fixture = Fixture::new("+");
        let mut ctx = fixture.context();
        Tilt::by(90.0).with_jitter(0.0).apply(&mut ctx).unwrap();
        assert!((ctx.turtle.heading.truncate() - Vec3::NEG_X).length() < 1e-5);

        // Turning about the heading's own axis leaves it in place.
        let mut fixture = Fixture::new("+");
        let mut ctx = fixture.context();
        Rotate::by(90.0).with_jitter(0.0).apply(&mut ctx).unwrap();
        assert!((ctx.turtle.heading.truncate() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut fixture = Fixture::new("/");
        let mut ctx = fixture.context();
        ctx.turtle
            .apply_transform(Mat4::from_translation(Vec3::new(0.3, 1.7, -2.2)));
        let before = ctx.turtle.heading.truncate();
        Tilt::by(20.0).apply(&mut ctx).unwrap();
        let turned = before.angle_between(ctx.turtle.heading.truncate()).to_degrees();
        assert!((15.0 - 1e-3..=25.0 + 1e-3).contains(&turned), "turned {}", turned);
    }

    #[test]
    fn test_tick_gravity_bends_down() {
        let mut fixture = Fixture::new("S");
        let mut ctx = fixture.context();
        ctx.turtle.apply_transform(Mat4::from_rotation_z(-1.0));
        let before = ctx.turtle.heading.y;
        EnvironmentTick::default().apply(&mut ctx).unwrap();
        assert!(ctx.turtle.heading.y < before);
    }

    #[test]
    fn test_tick_is_identity_when_upright_and_calm() {
        let mut fixture = Fixture::new("S");
        let mut ctx = fixture.context();
        // Heading straight up: the gravity axis is degenerate, sunlight is 0.
        EnvironmentTick::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.turtle.transform, Mat4::IDENTITY);
    }

    #[test]
    fn test_push_pop_dispatch() {
        let mut fixture = Fixture::new("[]");
        let mut ctx = fixture.context();
        Operation::PushState.apply(&mut ctx).unwrap();
        assert_eq!(ctx.depth, 2);
        Operation::PopState.apply(&mut ctx).unwrap();
        assert_eq!(ctx.depth, 1);
        assert!(Operation::PopState.apply(&mut ctx).is_err());
    }
}

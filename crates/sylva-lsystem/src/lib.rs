//! Stochastic L-systems interpreted by a collision-aware 3D turtle.
//!
//! A [`Grammar`] rewrites an axiom with weighted productions, choosing among
//! them with deterministic noise. The derived string is then walked once by
//! an [`Interpreter`]: every symbol bound in [`SymbolBindings`] runs an
//! [`Operation`] that turns the turtle, saves or restores it, or places
//! branch and leaf instances into the host's [`Scope`]. Branch placements
//! that would intersect earlier branches are rejected using a per-run
//! [`sylva_spatial::CollisionWorld`].
//!
//! # Example
//!
//! ```
//! use sylva_lsystem::{Scope, presets};
//!
//! let plant = presets::canopy(7);
//! let mut scope = Scope::new().with_leaf_variants(presets::CANOPY_LEAF_VARIANTS);
//!
//! let construction = plant.construct(3, &mut scope).unwrap();
//! assert_eq!(scope.branch.len(), construction.summary.branches_placed);
//! ```

mod bindings;
mod error;
mod grammar;
mod interpreter;
mod ops;
pub mod presets;
mod scope;
mod structure;
mod system;
mod turtle;

pub use bindings::SymbolBindings;
pub use error::{LSystemError, Result};
pub use grammar::{Grammar, Production, ProductionSet};
pub use interpreter::{ExecutionContext, INITIAL_DEPTH, Interpreter, RunSummary};
pub use ops::{DrawBranch, DrawLeaf, EnvironmentTick, Operation, Rotate, Tilt, TurtleOp};
pub use scope::{Influencers, InstanceBuffer, LineBuffer, Scope};
pub use structure::BranchStructure;
pub use system::{Construction, LSystem, LSystemDefinition, construct};
pub use turtle::{ExecutionStack, StackEntry, TurtleState};

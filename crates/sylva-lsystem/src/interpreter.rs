//! Single-pass interpretation of a derived string.

use sylva_noise::NoiseSource;
use sylva_spatial::CollisionWorld;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bindings::SymbolBindings;
use crate::error::{LSystemError, Result};
use crate::ops::TurtleOp;
use crate::scope::Scope;
use crate::structure::BranchStructure;
use crate::turtle::{ExecutionStack, TurtleState};

/// Nesting depth before the first symbol: the trunk is order 1.
pub const INITIAL_DEPTH: u32 = 1;

/// Counters collected over one interpretation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Symbols that had a binding.
    pub symbols_executed: usize,
    /// Branch instances emitted.
    pub branches_placed: usize,
    /// Leaf instances emitted.
    pub leaves_placed: usize,
    /// Placements rejected by collision checks.
    pub collisions: usize,
    /// Placements rejected for starting too low.
    pub ground_rejections: usize,
    /// Nesting depth after the last symbol.
    pub final_depth: u32,
    /// Saved states never restored.
    pub stack_remaining: usize,
}

/// Everything an operation can read or change while it runs.
pub struct ExecutionContext<'a> {
    /// The live turtle.
    pub turtle: TurtleState,
    /// Saved turtles.
    pub stack: ExecutionStack,
    /// Current nesting depth.
    pub depth: u32,
    /// Index of the running symbol.
    pub index: usize,
    /// The whole derived string.
    pub symbols: &'a [char],
    /// Precomputed structure of `symbols`.
    pub structure: &'a BranchStructure,
    /// Noise for jitter and variant choice.
    pub noise: &'a NoiseSource,
    /// Host-supplied sinks and parameters.
    pub scope: &'a mut Scope,
    /// Collision state of this run.
    pub collisions: &'a mut CollisionWorld,
    /// Counters for this run.
    pub summary: RunSummary,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context at the start of `symbols`.
    pub fn new(
        symbols: &'a [char],
        structure: &'a BranchStructure,
        noise: &'a NoiseSource,
        scope: &'a mut Scope,
        collisions: &'a mut CollisionWorld,
    ) -> Self {
        Self {
            turtle: TurtleState::new(),
            stack: ExecutionStack::new(),
            depth: INITIAL_DEPTH,
            index: 0,
            symbols,
            structure,
            noise,
            scope,
            collisions,
            summary: RunSummary::default(),
        }
    }

    /// Saves a copy of the turtle and opens a nesting level.
    pub fn save_state(&mut self) {
        self.stack.push(&self.turtle);
        self.depth += 1;
    }

    /// Restores the most recently saved turtle and closes a nesting level.
    pub fn restore_state(&mut self) -> Result<()> {
        let saved = self
            .stack
            .pop()
            .ok_or(LSystemError::StackUnderflow { index: self.index })?;
        self.turtle = saved;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }
}

/// Runs bound operations over derived strings.
///
/// # Example
///
/// ```
/// use sylva_lsystem::{Interpreter, Operation, Scope, SymbolBindings};
/// use sylva_noise::NoiseSource;
///
/// let bindings = SymbolBindings::bracketed().with('F', Operation::branch());
/// let noise = NoiseSource::new(1);
/// let mut scope = Scope::new();
///
/// let summary = Interpreter::new(&bindings, &noise).run("F[F]F", &mut scope).unwrap();
/// assert_eq!(summary.final_depth, 1);
/// assert_eq!(scope.branch.len(), summary.branches_placed);
/// ```
pub struct Interpreter<'a> {
    bindings: &'a SymbolBindings,
    noise: &'a NoiseSource,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter for one binding table and noise source.
    pub fn new(bindings: &'a SymbolBindings, noise: &'a NoiseSource) -> Self {
        Self { bindings, noise }
    }

    /// Interprets `derived` with fresh collision state.
    pub fn run(&self, derived: &str, scope: &mut Scope) -> Result<RunSummary> {
        let mut collisions = CollisionWorld::new();
        self.run_with_collisions(derived, scope, &mut collisions)
    }

    /// Interprets `derived` against existing collision state.
    ///
    /// Walks the string once, left to right. Unbound symbols are skipped.
    /// A restore with nothing saved aborts the run with
    /// [`LSystemError::StackUnderflow`]; geometry emitted before that point
    /// stays in `scope`.
    pub fn run_with_collisions(
        &self,
        derived: &str,
        scope: &mut Scope,
        collisions: &mut CollisionWorld,
    ) -> Result<RunSummary> {
        let symbols: Vec<char> = derived.chars().collect();
        let structure = BranchStructure::analyze(
            &symbols,
            |c| self.bindings.is_push(c),
            |c| self.bindings.is_pop(c),
            self.bindings.leaf_marker(),
            INITIAL_DEPTH,
        );

        let mut ctx = ExecutionContext::new(&symbols, &structure, self.noise, scope, collisions);

        for (index, &symbol) in symbols.iter().enumerate() {
            let Some(op) = self.bindings.get(symbol) else {
                continue;
            };
            ctx.index = index;
            op.apply(&mut ctx)?;
            ctx.summary.symbols_executed += 1;
        }

        let mut summary = ctx.summary;
        summary.final_depth = ctx.depth;
        summary.stack_remaining = ctx.stack.len();

        if summary.stack_remaining > 0 {
            log::warn!(
                "{} saved states were never restored",
                summary.stack_remaining
            );
        }
        log::debug!(
            "interpreted {} symbols: {} branches, {} leaves, {} collisions, {} below ground",
            summary.symbols_executed,
            summary.branches_placed,
            summary.leaves_placed,
            summary.collisions,
            summary.ground_rejections
        );
        Ok(summary)
    }
}

//! Symbol to operation table.

use std::collections::HashMap;

use crate::ops::Operation;

/// Maps symbols to the operations they run.
///
/// Symbols without a binding are inert during interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolBindings {
    ops: HashMap<char, Operation>,
    leaf_marker: char,
}

impl Default for SymbolBindings {
    fn default() -> Self {
        Self {
            ops: HashMap::new(),
            leaf_marker: 'l',
        }
    }
}

impl SymbolBindings {
    /// Creates an empty table. The leaf marker defaults to `'l'`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with `[` bound to save and `]` to restore.
    pub fn bracketed() -> Self {
        Self::new()
            .with('[', Operation::PushState)
            .with(']', Operation::PopState)
    }

    /// Binds `symbol`, replacing any earlier binding.
    pub fn bind(&mut self, symbol: char, op: Operation) -> &mut Self {
        self.ops.insert(symbol, op);
        self
    }

    /// Builder form of [`SymbolBindings::bind`].
    pub fn with(mut self, symbol: char, op: Operation) -> Self {
        self.bind(symbol, op);
        self
    }

    /// Sets the symbol the leaf look-ahead searches for.
    pub fn with_leaf_marker(mut self, marker: char) -> Self {
        self.leaf_marker = marker;
        self
    }

    /// The operation bound to `symbol`.
    pub fn get(&self, symbol: char) -> Option<&Operation> {
        self.ops.get(&symbol)
    }

    /// Returns `true` if `symbol` saves the turtle.
    pub fn is_push(&self, symbol: char) -> bool {
        matches!(self.ops.get(&symbol), Some(Operation::PushState))
    }

    /// Returns `true` if `symbol` restores the turtle.
    pub fn is_pop(&self, symbol: char) -> bool {
        matches!(self.ops.get(&symbol), Some(Operation::PopState))
    }

    /// The symbol the leaf look-ahead searches for.
    pub fn leaf_marker(&self) -> char {
        self.leaf_marker
    }

    /// Number of bound symbols.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Every binding, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &Operation)> {
        self.ops.iter().map(|(&symbol, op)| (symbol, op))
    }
}

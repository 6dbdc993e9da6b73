//! Error types for L-system construction.

use thiserror::Error;

/// Errors that abort a rewrite or an interpretation run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LSystemError {
    /// A state restore was reached with nothing saved: the derived string
    /// closes more branches than it opens.
    #[error("unbalanced derivation: restore at symbol {index} with an empty stack")]
    StackUnderflow {
        /// Position of the offending symbol in the derived string.
        index: usize,
    },

    /// A production was registered with a weight that cannot take part in
    /// weighted selection.
    #[error("production for '{symbol}' has weight {weight}; weights must be finite and positive")]
    InvalidWeight {
        /// Source symbol of the production.
        symbol: char,
        /// The rejected weight.
        weight: f32,
    },

    /// Selection was attempted on a set with no productions.
    #[error("no productions registered for '{symbol}'")]
    EmptyProductionSet {
        /// Source symbol of the set.
        symbol: char,
    },

    /// Selection was attempted on a set whose weights do not sum to a
    /// positive number.
    #[error("productions for '{symbol}' have total weight {total}")]
    NonPositiveTotalWeight {
        /// Source symbol of the set.
        symbol: char,
        /// The offending total.
        total: f32,
    },
}

/// Result type for L-system operations.
pub type Result<T> = std::result::Result<T, LSystemError>;

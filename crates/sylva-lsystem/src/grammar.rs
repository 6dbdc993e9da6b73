//! Weighted stochastic string rewriting.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sylva_noise::NoiseSource;

use crate::error::{LSystemError, Result};

/// A production rule for an L-system.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Production {
    /// The symbol to replace.
    pub source: char,
    /// The replacement string.
    pub replacement: String,
    /// Relative weight among the productions sharing `source`.
    #[cfg_attr(feature = "serde", serde(default = "unit_weight"))]
    pub weight: f32,
}

#[cfg(feature = "serde")]
fn unit_weight() -> f32 {
    1.0
}

impl Production {
    /// Creates a production with weight 1.
    pub fn new(source: char, replacement: &str) -> Self {
        Self::weighted(source, replacement, 1.0)
    }

    /// Creates a production with the given weight.
    pub fn weighted(source: char, replacement: &str, weight: f32) -> Self {
        Self {
            source,
            replacement: replacement.to_string(),
            weight,
        }
    }
}

fn check_weight(production: &Production) -> Result<()> {
    if production.weight.is_finite() && production.weight > 0.0 {
        Ok(())
    } else {
        Err(LSystemError::InvalidWeight {
            symbol: production.source,
            weight: production.weight,
        })
    }
}

/// All productions registered for one source symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSet {
    source: char,
    productions: Vec<Production>,
    total_weight: f32,
}

impl ProductionSet {
    /// Creates an empty set for `source`.
    pub fn new(source: char) -> Self {
        Self {
            source,
            productions: Vec::new(),
            total_weight: 0.0,
        }
    }

    /// Adds a production, rejecting weights that are not finite and positive.
    pub fn push(&mut self, production: Production) -> Result<()> {
        check_weight(&production)?;
        self.push_unchecked(production);
        Ok(())
    }

    fn push_unchecked(&mut self, production: Production) {
        self.total_weight += production.weight;
        self.productions.push(production);
    }

    /// Source symbol of every production in the set.
    pub fn source(&self) -> char {
        self.source
    }

    /// Productions in registration order.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Number of productions.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Picks one production.
    ///
    /// A set with a single production returns it without calling `sample`.
    /// Otherwise `sample` is called once and must return a value in [0, 1);
    /// it is scaled by the total weight and productions are walked from the
    /// **last** to the first, accumulating weights, until the running sum
    /// exceeds the scaled sample.
    ///
    /// If rounding leaves the running sum at or below the scaled sample after
    /// every production, the first production is returned.
    pub fn select(&self, sample: impl FnOnce() -> f32) -> Result<&Production> {
        match self.productions.as_slice() {
            [] => Err(LSystemError::EmptyProductionSet {
                symbol: self.source,
            }),
            [only] => Ok(only),
            [first, ..] => {
                if self.total_weight.is_nan() || self.total_weight <= 0.0 {
                    return Err(LSystemError::NonPositiveTotalWeight {
                        symbol: self.source,
                        total: self.total_weight,
                    });
                }

                let threshold = sample() * self.total_weight;
                let mut progress = 0.0;
                for production in self.productions.iter().rev() {
                    progress += production.weight;
                    if progress > threshold {
                        return Ok(production);
                    }
                }

                log::warn!(
                    "weighted pick for '{}' fell through at {threshold} of {}; using the first production",
                    self.source,
                    self.total_weight
                );
                Ok(first)
            }
        }
    }
}

/// Axiom plus productions.
///
/// # Example
///
/// ```
/// use sylva_lsystem::Grammar;
/// use sylva_noise::NoiseSource;
///
/// let grammar = Grammar::new("F").with_production('F', "F[/F]");
/// let derived = grammar.rewrite(2, &NoiseSource::new(0)).unwrap();
/// assert_eq!(derived, "F[/F][/F[/F]]");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    axiom: String,
    productions: HashMap<char, ProductionSet>,
}

impl Grammar {
    /// Creates a grammar with the given axiom and no productions.
    pub fn new(axiom: &str) -> Self {
        Self {
            axiom: axiom.to_string(),
            productions: HashMap::new(),
        }
    }

    /// The starting string.
    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    /// Replaces the starting string.
    pub fn set_axiom(&mut self, axiom: &str) -> &mut Self {
        self.axiom = axiom.to_string();
        self
    }

    /// Registers a production with weight 1.
    pub fn add_production(&mut self, symbol: char, replacement: &str) -> &mut Self {
        self.set_for(symbol)
            .push_unchecked(Production::new(symbol, replacement));
        self
    }

    /// Registers a production with an explicit weight.
    pub fn add_weighted_production(
        &mut self,
        symbol: char,
        replacement: &str,
        weight: f32,
    ) -> Result<&mut Self> {
        let production = Production::weighted(symbol, replacement, weight);
        check_weight(&production)?;
        self.set_for(symbol).push_unchecked(production);
        Ok(self)
    }

    fn set_for(&mut self, symbol: char) -> &mut ProductionSet {
        self.productions
            .entry(symbol)
            .or_insert_with(|| ProductionSet::new(symbol))
    }

    /// Registers a weighted production whose weight is known to be valid.
    pub(crate) fn add_production_unchecked(
        &mut self,
        symbol: char,
        replacement: &str,
        weight: f32,
    ) -> &mut Self {
        debug_assert!(weight.is_finite() && weight > 0.0);
        self.set_for(symbol)
            .push_unchecked(Production::weighted(symbol, replacement, weight));
        self
    }

    /// Builder form of [`Grammar::add_production`].
    pub fn with_production(mut self, symbol: char, replacement: &str) -> Self {
        self.add_production(symbol, replacement);
        self
    }

    /// Builder form of [`Grammar::add_weighted_production`].
    pub fn with_weighted_production(
        mut self,
        symbol: char,
        replacement: &str,
        weight: f32,
    ) -> Result<Self> {
        self.add_weighted_production(symbol, replacement, weight)?;
        Ok(self)
    }

    /// Productions registered for `symbol`, if any.
    pub fn production_set(&self, symbol: char) -> Option<&ProductionSet> {
        self.productions.get(&symbol)
    }

    /// Rewrites the axiom `iterations` times.
    ///
    /// Every pass replaces each symbol that has productions with one chosen
    /// replacement and copies every other symbol unchanged. Each selection
    /// among several productions draws one sample keyed by the pass, the
    /// symbol's position in that pass's input, and the symbol, so a fixed
    /// seed always yields the same string.
    pub fn rewrite(&self, iterations: u32, noise: &NoiseSource) -> Result<String> {
        let mut current = self.axiom.clone();

        for pass in 0..iterations {
            let mut next = String::with_capacity(current.len() * 2);

            for (position, symbol) in current.chars().enumerate() {
                match self.productions.get(&symbol) {
                    None => next.push(symbol),
                    Some(set) => {
                        let production =
                            set.select(|| noise.selection_sample(pass, position, symbol))?;
                        next.push_str(&production.replacement);
                    }
                }
            }

            current = next;
        }

        log::debug!(
            "derived {} symbols from '{}' in {iterations} passes",
            current.chars().count(),
            self.axiom
        );
        Ok(current)
    }
}

//! Grammar, bindings and noise for one plant, plus the host entry points.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sylva_noise::NoiseSource;

use crate::bindings::SymbolBindings;
use crate::error::Result;
use crate::grammar::{Grammar, Production};
use crate::interpreter::{Interpreter, RunSummary};
use crate::ops::Operation;
use crate::scope::Scope;

/// Result of one [`LSystem::construct`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Construction {
    /// The derived string that was interpreted.
    pub derived: String,
    /// Counters from the interpretation run.
    pub summary: RunSummary,
}

/// A plant definition: grammar, symbol bindings and its noise source.
///
/// # Example
///
/// ```
/// use sylva_lsystem::{LSystem, Operation, Scope};
///
/// let mut plant = LSystem::new(42);
/// plant.grammar.set_axiom("D").add_production('D', "D[+D]D");
/// plant.bindings.bind('D', Operation::branch());
/// plant.bindings.bind('+', Operation::rotate(30.0));
/// plant.bindings.bind('[', Operation::PushState);
/// plant.bindings.bind(']', Operation::PopState);
///
/// let mut scope = Scope::new();
/// let construction = plant.construct(2, &mut scope).unwrap();
/// assert_eq!(construction.derived, "D[+D]D[+D[+D]D]D[+D]D");
/// assert!(!scope.branch.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct LSystem {
    /// Axiom and productions.
    pub grammar: Grammar,
    /// Symbol operations.
    pub bindings: SymbolBindings,
    noise: NoiseSource,
}

impl LSystem {
    /// Creates an empty system seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            grammar: Grammar::default(),
            bindings: SymbolBindings::new(),
            noise: NoiseSource::new(seed),
        }
    }

    /// Replaces the grammar.
    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Replaces the bindings.
    pub fn with_bindings(mut self, bindings: SymbolBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// The seed every noise draw derives from.
    pub fn seed(&self) -> u64 {
        self.noise.seed()
    }

    /// The noise source.
    pub fn noise(&self) -> &NoiseSource {
        &self.noise
    }

    /// Rewrites the axiom `iterations` times.
    pub fn derive(&self, iterations: u32) -> Result<String> {
        self.grammar.rewrite(iterations, &self.noise)
    }

    /// Derives and interprets, emitting geometry into `scope`.
    ///
    /// Each call starts from the axiom with an empty collision world and a
    /// zeroed collision count, so calls never see each other's placements.
    /// Sinks in `scope` are appended to, not cleared.
    pub fn construct(&self, iterations: u32, scope: &mut Scope) -> Result<Construction> {
        let derived = self.derive(iterations)?;
        scope.collision_count = 0;

        let summary = Interpreter::new(&self.bindings, &self.noise).run(&derived, scope)?;

        if scope.collision_count > 0 {
            log::info!("found {} collisions", scope.collision_count);
        }
        Ok(Construction { derived, summary })
    }
}

/// A complete plant description as one value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LSystemDefinition {
    /// Noise seed.
    pub seed: u64,
    /// Starting string.
    pub axiom: String,
    /// Productions registered with weight 1, as `(symbol, replacement)`.
    pub productions: Vec<(char, String)>,
    /// Productions with explicit weights.
    pub weighted_productions: Vec<Production>,
    /// Symbol operations.
    pub bindings: Vec<(char, Operation)>,
    /// Symbol the leaf look-ahead searches for.
    pub leaf_marker: char,
    /// Number of rewrite passes.
    pub iterations: u32,
}

impl Default for LSystemDefinition {
    fn default() -> Self {
        Self {
            seed: 0,
            axiom: String::new(),
            productions: Vec::new(),
            weighted_productions: Vec::new(),
            bindings: Vec::new(),
            leaf_marker: 'l',
            iterations: 0,
        }
    }
}

impl LSystemDefinition {
    /// Builds the system, validating every weight.
    pub fn build(&self) -> Result<LSystem> {
        let mut grammar = Grammar::new(&self.axiom);
        for (symbol, replacement) in &self.productions {
            grammar.add_production(*symbol, replacement);
        }
        for production in &self.weighted_productions {
            grammar.add_weighted_production(
                production.source,
                &production.replacement,
                production.weight,
            )?;
        }

        let mut bindings = SymbolBindings::new().with_leaf_marker(self.leaf_marker);
        for (symbol, op) in &self.bindings {
            bindings.bind(*symbol, *op);
        }

        Ok(LSystem::new(self.seed)
            .with_grammar(grammar)
            .with_bindings(bindings))
    }
}

/// Builds `definition` and constructs it into `scope`.
pub fn construct(definition: &LSystemDefinition, scope: &mut Scope) -> Result<Construction> {
    definition.build()?.construct(definition.iterations, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LSystemError;

    fn definition() -> LSystemDefinition {
        LSystemDefinition {
            seed: 5,
            axiom: "F".to_string(),
            productions: vec![('F', "F[/F]".to_string())],
            bindings: vec![
                ('F', Operation::branch()),
                ('/', Operation::tilt(-20.0)),
                ('[', Operation::PushState),
                (']', Operation::PopState),
            ],
            iterations: 2,
            ..LSystemDefinition::default()
        }
    }

    #[test]
    fn test_end_to_end_derivation() {
        let mut scope = Scope::new();
        let construction = construct(&definition(), &mut scope).unwrap();
        assert_eq!(construction.derived, "F[/F][/F[/F]]");
        assert_eq!(construction.summary.final_depth, 1);
        assert_eq!(
            scope.branch.len() + construction.summary.collisions,
            4
        );
    }

    #[test]
    fn test_construct_is_repeatable() {
        let plant = definition().build().unwrap();
        let mut first = Scope::new().with_bounding_lines();
        let mut second = Scope::new().with_bounding_lines();
        let a = plant.construct(4, &mut first).unwrap();
        let b = plant.construct(4, &mut second).unwrap();
        assert_eq!(a, b);
        assert_eq!(first, second);
    }

    #[test]
    fn test_independent_systems_do_not_share_collisions() {
        let a = definition().build().unwrap();
        let b = definition().build().unwrap();
        let mut scope_a = Scope::new();
        let mut scope_b = Scope::new();

        let first = a.construct(3, &mut scope_a).unwrap();
        let _ = b.construct(3, &mut scope_b).unwrap();
        let again = a.construct(3, &mut Scope::new()).unwrap();
        assert_eq!(first.summary, again.summary);
    }

    #[test]
    fn test_invalid_definition() {
        let mut bad = definition();
        bad.weighted_productions
            .push(Production::weighted('F', "FF", -2.0));
        assert!(matches!(
            bad.build().unwrap_err(),
            LSystemError::InvalidWeight { symbol: 'F', .. }
        ));
    }

    #[test]
    fn test_unbalanced_productions_fail() {
        let mut bad = definition();
        bad.productions = vec![('F', "F]".to_string())];
        let err = construct(&bad, &mut Scope::new()).unwrap_err();
        assert!(matches!(err, LSystemError::StackUnderflow { .. }));
    }

    #[test]
    fn test_collision_count_resets_per_call() {
        let plant = definition().build().unwrap();
        let mut scope = Scope::new();
        scope.collision_count = 99;
        let construction = plant.construct(2, &mut scope).unwrap();
        assert_eq!(
            scope.collision_count as usize,
            construction.summary.collisions
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "seed": 9,
            "axiom": "F",
            "weighted_productions": [
                { "source": "F", "replacement": "F[/F]", "weight": 0.6 },
                { "source": "F", "replacement": "FF", "weight": 0.4 }
            ],
            "bindings": [
                ["F", { "DrawBranch": {} }],
                ["/", { "Tilt": { "angle": -20.0 } }],
                ["[", "PushState"],
                ["]", "PopState"]
            ],
            "iterations": 3
        }"#;

        let definition: LSystemDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.leaf_marker, 'l');
        assert_eq!(definition.bindings.len(), 4);
        assert_eq!(
            definition.bindings[1].1,
            Operation::Tilt(crate::ops::Tilt::by(-20.0))
        );

        let mut scope = Scope::new();
        let construction = construct(&definition, &mut scope).unwrap();
        assert!(!construction.derived.is_empty());

        let round = serde_json::to_string(&definition).unwrap();
        let back: LSystemDefinition = serde_json::from_str(&round).unwrap();
        assert_eq!(back, definition);
    }
}

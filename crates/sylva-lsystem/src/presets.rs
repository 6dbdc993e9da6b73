//! Ready-made plants.

use crate::bindings::SymbolBindings;
use crate::grammar::Grammar;
use crate::ops::Operation;
use crate::system::LSystem;

/// Number of leaf variants the canopy is tuned for.
pub const CANOPY_LEAF_VARIANTS: usize = 4;

/// A broad tree: five trunks fanning out, stochastic forking, leaves on
/// inner branches and at tips.
///
/// `D` draws a branch, `S` applies sun and gravity, `l` and `b` draw leaves,
/// `+`/`-` turn by 45 degrees and `/`/`*` tilt by 20 degrees.
pub fn canopy(seed: u64) -> LSystem {
    let mut grammar = Grammar::new("[F][/-F][*+F][++*F][--*F]");
    grammar.add_production_unchecked('F', "BS++[/BFS][*BFS]++[/BFS][*BbFS]", 0.5);
    grammar.add_production_unchecked('F', "BS++[/BFS][*BFS]", 0.3);
    grammar.add_production_unchecked('B', "SD[l]SD", 0.2);

    let bindings = SymbolBindings::bracketed()
        .with('l', Operation::leaf())
        .with('b', Operation::leaf())
        .with('D', Operation::branch())
        .with('S', Operation::tick())
        .with('-', Operation::rotate(45.0))
        .with('+', Operation::rotate(-45.0))
        .with('/', Operation::tilt(-20.0))
        .with('*', Operation::tilt(20.0));

    LSystem::new(seed)
        .with_grammar(grammar)
        .with_bindings(bindings)
}

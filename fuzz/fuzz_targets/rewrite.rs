#![no_main]

use libfuzzer_sys::fuzz_target;
use sylva_lsystem::{Grammar, Interpreter, Scope, presets};
use sylva_noise::NoiseSource;

fuzz_target!(|input: (&str, &str, &str)| {
    let (axiom, first, second) = input;
    let Some(symbol) = axiom.chars().next() else {
        return;
    };
    let grammar = Grammar::new(axiom)
        .with_production(symbol, first)
        .with_production(symbol, second);

    // Two passes keep the derived string bounded
    let noise = NoiseSource::new(axiom.len() as u64);
    let Ok(derived) = grammar.rewrite(2, &noise) else {
        return;
    };

    let plant = presets::canopy(1);
    let mut scope = Scope::new().with_leaf_variants(2);
    let _ = Interpreter::new(&plant.bindings, &noise).run(&derived, &mut scope);
});

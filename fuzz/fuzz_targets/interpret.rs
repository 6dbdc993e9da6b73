#![no_main]

use libfuzzer_sys::fuzz_target;
use sylva_lsystem::{Interpreter, Scope, presets};

fuzz_target!(|data: &str| {
    // Unbalanced brackets must surface as errors, never panics
    let plant = presets::canopy(0);
    let mut scope = Scope::new().with_leaf_variants(presets::CANOPY_LEAF_VARIANTS);
    let _ = Interpreter::new(&plant.bindings, plant.noise()).run(data, &mut scope);
});

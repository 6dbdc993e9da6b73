//! Grows the canopy preset and prints what it placed.
//!
//! Usage: `cargo run --example canopy -- [seed] [iterations]`

use simplelog::{Config, LevelFilter, SimpleLogger};
use sylva_lsystem::{Influencers, Scope, presets};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::init(LevelFilter::Info, Config::default())?;

    let mut args = std::env::args().skip(1);
    let seed = args.next().map(|s| s.parse::<u64>()).transpose()?.unwrap_or(1337);
    let iterations = args.next().map(|s| s.parse::<u32>()).transpose()?.unwrap_or(4);

    let plant = presets::canopy(seed);
    let mut scope = Scope::new()
        .with_leaf_variants(presets::CANOPY_LEAF_VARIANTS)
        .with_bounding_lines()
        .with_influencers(Influencers::default().with_sunlight(0.2));

    let construction = plant.construct(iterations, &mut scope)?;
    let summary = construction.summary;

    log::info!(
        "seed {seed}, {iterations} passes: {} symbols derived",
        construction.derived.chars().count()
    );
    log::info!(
        "{} branches, {} leaves, {} collisions, {} below ground",
        summary.branches_placed,
        summary.leaves_placed,
        summary.collisions,
        summary.ground_rejections
    );
    for (variant, leaves) in scope.leaves.iter().enumerate() {
        log::info!("leaf variant {variant}: {} instances", leaves.len());
    }
    if let Some(lines) = &scope.bounding_lines {
        log::info!("{} bounding lines", lines.len());
    }

    Ok(())
}

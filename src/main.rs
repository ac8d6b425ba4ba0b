use std::env;

use anyhow::Context;
use log::info;
use target_sweep::{configs::SweepConfig, sweep::Sweep};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => SweepConfig::from_file(&path)
            .with_context(|| format!("failed to load sweep config from {path}"))?,
        None => {
            info!("no config file given, using the default sweep");
            SweepConfig::default()
        }
    };

    let seeds = config.seeds.resolve(&mut rand::rng())?;
    let sweep = Sweep::new(&config, seeds);
    info!(
        "sweeping {} datasets with seeds {:?}",
        config.dataset_ids.len(),
        sweep.seeds()
    );

    let rows = sweep.run()?;
    for row in &rows {
        println!("{row}");
    }

    Ok(())
}

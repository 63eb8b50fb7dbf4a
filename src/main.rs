#![allow(dead_code)]

#[macro_use]
extern crate log;
extern crate pretty_env_logger;

use std::path::PathBuf;

use synthpop_epidemic_sim::params::Params;

/// Minimal wiring example: loads a parameter file named on the command line
/// (or `params.json` in the working directory) and logs a summary. Building
/// a population from external census/household tables and writing the §6
/// output tables is left to the calling application; this binary exists to
/// demonstrate that the crate's pieces compose, not to be a full CLI.
fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    info!("synthpop-epidemic-sim starting");

    let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("params.json"));
    let params = Params::load(&path)?;

    let seeds = params.random_seed.resolve()?;
    info!(
        "loaded parameters for experiment {:?}: {} seed(s), max_time={}",
        params.experiment_id,
        seeds.len(),
        params.max_time
    );

    Ok(())
}

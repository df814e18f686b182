use std::path::Path;

use ai_command::ControllerConfig;
use anyhow::{Context, Result};

mod behavior;
mod cli;
mod commands;
mod pawn;
mod report;
mod scenario;

use scenario::Simulation;

fn main() -> Result<()> {
    let args = cli::parse()?;

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(args.config.as_deref())?;
    let report = Simulation::new(args.scenario, config).run(args.ticks, args.dt);
    report.print_summary(args.verbose);

    if let Some(path) = args.report_json.as_ref() {
        report.write_json(path)?;
        println!("\nSaved run report to {}", path.display());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    let Some(path) = path else {
        return Ok(ControllerConfig::default());
    };
    ControllerConfig::from_json_file(path)
        .with_context(|| format!("loading controller config from {}", path.display()))
}

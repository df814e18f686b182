use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Idle, then walk the patrol loop
    Patrol,
    /// Patrol interrupted twice by investigations pushed from outside
    Interrupt,
    /// A command that keeps pushing copies of itself
    Runaway,
}

impl Scenario {
    pub fn name(self) -> &'static str {
        match self {
            Scenario::Patrol => "patrol",
            Scenario::Interrupt => "interrupt",
            Scenario::Runaway => "runaway",
        }
    }
}

/// Headless driver for the AI command stack.
#[derive(Parser, Debug)]
#[command(about = "Drives a simulated pawn through scripted command-stack scenarios", version)]
pub struct Args {
    /// Scenario to run
    #[arg(long, value_enum, default_value_t = Scenario::Patrol)]
    pub scenario: Scenario,

    /// Number of controller ticks to simulate
    #[arg(long, default_value_t = 200)]
    pub ticks: u32,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    pub dt: f32,

    /// Optional JSON controller config (history_capacity, runaway_threshold, abort_runaway)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to write the run report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Log every stack event, not just warnings
    #[arg(long)]
    pub verbose: bool,
}

pub fn parse() -> Result<Args> {
    let args = Args::parse();
    args.validate()?;
    Ok(args)
}

impl Args {
    fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            bail!("--dt must be a positive number of seconds (got {})", self.dt);
        }
        if self.ticks == 0 {
            bail!("--ticks must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_the_patrol() {
        let args = Args::try_parse_from(["ai_sim"]).expect("defaults parse");
        assert_eq!(args.scenario, Scenario::Patrol);
        assert_eq!(args.ticks, 200);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_dt() {
        let args = Args::try_parse_from(["ai_sim", "--scenario", "runaway", "--dt", "0"])
            .expect("flags parse");
        assert_eq!(args.scenario, Scenario::Runaway);
        assert!(args.validate().is_err());
    }
}

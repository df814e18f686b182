use std::fs;
use std::path::Path;

use ai_command::{HistoryEntry, LogEntry, Severity};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::pawn::Vec2;

/// Outcome of one simulator run.
#[derive(Debug, Serialize)]
pub struct SimReport {
    pub scenario: &'static str,
    pub ticks: u32,
    pub dt: f32,
    pub world_time: f64,
    pub final_position: Vec2,
    pub final_depth: usize,
    pub runaway_count: u32,
    /// Scenario-level notes, one per scripted intervention.
    pub events: Vec<String>,
    /// Newest push first.
    pub history: Vec<HistoryEntry>,
    pub log: Vec<LogEntry>,
    pub dump: String,
}

impl SimReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing run report to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing run report to {}", path.display()))?;
        Ok(())
    }

    pub fn print_summary(&self, verbose: bool) {
        println!(
            "Scenario {}: {} ticks of {:.3}s ({:.2}s world time)",
            self.scenario, self.ticks, self.dt, self.world_time
        );
        println!(
            "Pawn at ({:.2}, {:.2}) | stack depth {} | runaway ticks {}",
            self.final_position.x, self.final_position.y, self.final_depth, self.runaway_count
        );

        if !self.events.is_empty() {
            println!("\nInterventions:");
            for event in &self.events {
                println!("  - {event}");
            }
        }

        println!("\nRecent pushes (newest first):");
        for entry in &self.history {
            if entry.description.is_empty() {
                println!("  {:>8.2}s {}", entry.time, entry.class);
            } else {
                println!("  {:>8.2}s {} ({})", entry.time, entry.class, entry.description);
            }
        }

        println!("\nCommand stack:\n{}", self.dump);

        if verbose {
            println!("\nLog:");
            for entry in &self.log {
                println!("  [{:?}] {}: {}", entry.severity, entry.category, entry.message);
            }
        }

        for entry in self.log.iter().filter(|entry| entry.severity >= Severity::Warning) {
            let headline = entry.message.lines().next().unwrap_or_default();
            eprintln!("[ai_sim] warning: {headline}");
        }
    }
}

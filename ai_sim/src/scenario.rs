//! Scripted runs of a controller driving a [`SimPawn`].

use std::rc::Rc;

use ai_command::{Controller, ControllerConfig, MemorySink, PushOutcome, Severity};

use crate::behavior::Roam;
use crate::cli::Scenario;
use crate::commands::{Investigate, Recurse};
use crate::pawn::{SimPawn, Vec2};
use crate::report::SimReport;

const PAWN_SPEED: f32 = 2.0;
const IDLE_SECONDS: f32 = 1.0;
const WAYPOINT_PAUSE: f32 = 0.5;
const PATROL_LAPS: u32 = 3;
const DUMP_LIMIT: usize = 16;

const PATROL_ROUTE: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(6.0, 0.0),
    Vec2::new(6.0, 6.0),
    Vec2::new(0.0, 6.0),
];

/// Ticks after the first investigation at which the second one arrives.
const SECOND_INTERRUPT_DELAY: u32 = 3;

pub struct Simulation {
    controller: Controller<SimPawn>,
    sink: Rc<MemorySink>,
    scenario: Scenario,
    events: Vec<String>,
}

impl Simulation {
    pub fn new(scenario: Scenario, config: ControllerConfig) -> Self {
        let sink = Rc::new(MemorySink::forwarding());
        let controller = Controller::new(config)
            .with_sink(sink.clone())
            .with_behavior(Box::new(Roam {
                waypoints: PATROL_ROUTE.to_vec(),
                idle_seconds: IDLE_SECONDS,
                pause: WAYPOINT_PAUSE,
                laps: PATROL_LAPS,
            }))
            .with_pawn(SimPawn::new(Vec2::default(), PAWN_SPEED));
        Self {
            controller,
            sink,
            scenario,
            events: Vec::new(),
        }
    }

    pub fn run(mut self, ticks: u32, dt: f32) -> SimReport {
        let first_interrupt = ticks / 3;
        if self.scenario == Scenario::Runaway {
            let outcome = self
                .controller
                .push_command_with(Box::new(Recurse { depth: 1 }), "depth 1");
            self.note(0, "Recurse", outcome);
        }

        for tick in 0..ticks {
            if self.scenario == Scenario::Interrupt {
                if tick == first_interrupt {
                    self.investigate(tick, Vec2::new(10.0, 10.0));
                } else if tick == first_interrupt + SECOND_INTERRUPT_DELAY {
                    self.investigate(tick, Vec2::new(-4.0, 3.0));
                }
            }

            if let Some(pawn) = self.controller.pawn_mut() {
                pawn.advance_clock(dt);
            }
            self.controller.tick(dt);
        }

        self.into_report(ticks, dt)
    }

    fn investigate(&mut self, tick: u32, spot: Vec2) {
        let outcome = self.controller.push_command_with(
            Box::new(Investigate { spot, linger: 1.0 }),
            format!("noise at ({:.1}, {:.1})", spot.x, spot.y),
        );
        self.note(tick, "Investigate", outcome);
    }

    fn note(&mut self, tick: u32, what: &str, outcome: PushOutcome) {
        let event = match outcome {
            PushOutcome::Pushed(id) => format!("tick {tick}: pushed {what} {id}"),
            PushOutcome::Replaced { id, replaced } => {
                format!("tick {tick}: {what} {id} replaced {replaced}")
            }
            PushOutcome::Ignored => format!("tick {tick}: {what} ignored"),
        };
        log::info!(target: "ai_sim", "{event}");
        self.events.push(event);
    }

    fn into_report(self, ticks: u32, dt: f32) -> SimReport {
        let verbose_log = log::log_enabled!(target: "ai_sim", log::Level::Debug);
        let log = self
            .sink
            .entries()
            .into_iter()
            .filter(|entry| verbose_log || entry.severity >= Severity::Info)
            .collect();
        SimReport {
            scenario: self.scenario.name(),
            ticks,
            dt,
            world_time: self.controller.world_time(),
            final_position: self
                .controller
                .pawn()
                .map(|pawn| pawn.position)
                .unwrap_or_default(),
            final_depth: self.controller.depth(),
            runaway_count: self.controller.runaway_count(),
            events: self.events,
            history: self.controller.history().iter().cloned().collect(),
            log,
            dump: self.controller.dump_command_stack(DUMP_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patrol_starts_after_idling() {
        let report = Simulation::new(Scenario::Patrol, ControllerConfig::default()).run(30, 0.1);
        assert_eq!(report.runaway_count, 0);
        assert!(report
            .history
            .iter()
            .any(|entry| entry.class.short_name() == "Patrol"));
        assert!(report.final_position.x > 0.0, "pawn walked toward the second waypoint");
    }

    #[test]
    fn second_investigation_replaces_the_first() {
        let report = Simulation::new(Scenario::Interrupt, ControllerConfig::default()).run(60, 0.1);
        assert_eq!(report.events.len(), 2);
        assert!(report.events[0].starts_with("tick 20: pushed Investigate"));
        assert!(report.events[1].contains("replaced"), "{:?}", report.events);
    }

    #[test]
    fn runaway_recursion_is_cut_off() {
        let config = ControllerConfig {
            runaway_threshold: 8,
            ..ControllerConfig::default()
        };
        let report = Simulation::new(Scenario::Runaway, config).run(20, 0.1);
        assert_eq!(report.runaway_count, 1);
        assert!(report
            .log
            .iter()
            .any(|entry| entry.message.contains("exceeds limit 8")));
    }
}

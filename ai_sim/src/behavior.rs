use ai_command::{Flow, HostBehavior, HostContext, StateName, BEGIN_LABEL};

use crate::commands::Patrol;
use crate::pawn::{SimPawn, Vec2};

/// Default behaviour: idle for a while, then start a patrol. Runs again
/// whenever the command stack empties.
pub struct Roam {
    pub waypoints: Vec<Vec2>,
    pub idle_seconds: f32,
    pub pause: f32,
    pub laps: u32,
}

impl HostBehavior<SimPawn> for Roam {
    fn states(&self) -> &'static [StateName] {
        &["Idle"]
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Idle")
    }

    fn execute(&mut self, ctx: &mut HostContext<'_, SimPawn>) -> Flow {
        match ctx.cursor().map_or(0, |cursor| cursor.offset) {
            0 => {
                ctx.sleep(self.idle_seconds);
                Flow::Next
            }
            1 => {
                let patrol =
                    Patrol::new(self.waypoints.clone(), self.pause).with_max_laps(self.laps);
                ctx.push_command_with(Box::new(patrol), "roam: start patrol");
                Flow::Next
            }
            _ => {
                ctx.goto_label(BEGIN_LABEL);
                Flow::Next
            }
        }
    }
}

//! Commands the simulated pawn understands.

use ai_command::{
    Command, CommandClass, CommandContext, Flow, LatentId, PushPolicy, Severity, StateName,
    Status, BEGIN_LABEL,
};

use crate::pawn::{SimPawn, Vec2};

/// Latent id of an in-progress walk.
pub const LATENT_MOVE: LatentId = 2;

const ARRIVAL_TOLERANCE: f32 = 0.05;

fn offset(ctx: &CommandContext<'_, SimPawn>) -> u32 {
    ctx.cursor().map_or(0, |cursor| cursor.offset)
}

fn has_arrived(ctx: &CommandContext<'_, SimPawn>, target: Vec2) -> bool {
    ctx.agent()
        .is_some_and(|pawn| pawn.position.distance(target) <= ARRIVAL_TOLERANCE)
}

/// Walks one step per poll until `pawn` reaches `target`.
fn poll_walk(ctx: &mut CommandContext<'_, SimPawn>, target: Vec2, delta_seconds: f32) {
    let arrived = match ctx.agent_mut() {
        Some(pawn) => pawn.step_toward(target, ARRIVAL_TOLERANCE, delta_seconds),
        None => true,
    };
    if arrived {
        ctx.finish_latent();
    }
}

/// Walk to a point. Restarts the walk if it was interrupted before arriving.
pub struct MoveTo {
    pub target: Vec2,
}

impl MoveTo {
    pub fn new(target: Vec2) -> Self {
        Self { target }
    }
}

impl Command<SimPawn> for MoveTo {
    fn states(&self) -> &'static [StateName] {
        &["Moving"]
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Moving")
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, SimPawn>) -> Flow {
        match offset(ctx) {
            0 => {
                if ctx.agent().is_none() {
                    ctx.finish(Status::Failure);
                    return Flow::Stop;
                }
                ctx.begin_latent(LATENT_MOVE);
                Flow::Next
            }
            _ => {
                if has_arrived(ctx, self.target) {
                    ctx.finish(Status::Success);
                    Flow::Stop
                } else {
                    ctx.goto_label(BEGIN_LABEL);
                    Flow::Next
                }
            }
        }
    }

    fn poll_latent(
        &mut self,
        latent: LatentId,
        delta_seconds: f32,
        ctx: &mut CommandContext<'_, SimPawn>,
    ) {
        if latent == LATENT_MOVE {
            poll_walk(ctx, self.target, delta_seconds);
        }
    }

    fn dump_string(&self) -> String {
        format!("MoveTo ({:.2}, {:.2})", self.target.x, self.target.y)
    }
}

pub struct Wait {
    pub seconds: f32,
}

impl Command<SimPawn> for Wait {
    fn auto_state(&self) -> Option<StateName> {
        Some("Waiting")
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, SimPawn>) -> Flow {
        match offset(ctx) {
            0 => {
                ctx.sleep(self.seconds);
                Flow::Next
            }
            _ => {
                ctx.finish(Status::Success);
                Flow::Stop
            }
        }
    }

    fn dump_string(&self) -> String {
        format!("Wait {:.2}s", self.seconds)
    }
}

/// Walks a closed loop of waypoints, pausing at each one.
pub struct Patrol {
    waypoints: Vec<Vec2>,
    pause: f32,
    max_laps: Option<u32>,
    next: usize,
    laps: u32,
}

impl Patrol {
    pub fn new(waypoints: Vec<Vec2>, pause: f32) -> Self {
        Self {
            waypoints,
            pause,
            max_laps: None,
            next: 0,
            laps: 0,
        }
    }

    pub fn with_max_laps(mut self, laps: u32) -> Self {
        self.max_laps = Some(laps);
        self
    }
}

impl Command<SimPawn> for Patrol {
    fn states(&self) -> &'static [StateName] {
        &["Patrolling"]
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Patrolling")
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, SimPawn>) -> Flow {
        match offset(ctx) {
            0 => {
                let Some(&waypoint) = self.waypoints.get(self.next) else {
                    ctx.log(Severity::Warning, "patrol has no waypoints");
                    ctx.finish(Status::Failure);
                    return Flow::Stop;
                };
                if self.max_laps.is_some_and(|max| self.laps >= max) {
                    ctx.finish(Status::Success);
                    return Flow::Stop;
                }
                ctx.push_child_with(
                    Box::new(MoveTo::new(waypoint)),
                    format!("waypoint {} of lap {}", self.next, self.laps + 1),
                );
                Flow::Next
            }
            1 => {
                if self.pause > 0.0 {
                    ctx.push_child(Box::new(Wait {
                        seconds: self.pause,
                    }));
                }
                Flow::Next
            }
            _ => {
                ctx.goto_label(BEGIN_LABEL);
                Flow::Next
            }
        }
    }

    fn resumed(
        &mut self,
        child: CommandClass,
        child_status: Status,
        ctx: &mut CommandContext<'_, SimPawn>,
    ) {
        if child != CommandClass::of::<MoveTo>() {
            return;
        }
        match child_status {
            Status::Success => {
                self.next += 1;
                if self.next >= self.waypoints.len() {
                    self.next = 0;
                    self.laps += 1;
                    ctx.log(Severity::Info, &format!("finished lap {}", self.laps));
                }
            }
            status => {
                ctx.log(Severity::Warning, &format!("waypoint {} ended {status:?}", self.next));
            }
        }
    }

    fn dump_string(&self) -> String {
        format!(
            "Patrol next={} of {} laps={}",
            self.next,
            self.waypoints.len(),
            self.laps
        )
    }
}

/// Walks to a spot and lingers there. A newer investigation replaces an
/// active one.
pub struct Investigate {
    pub spot: Vec2,
    pub linger: f32,
}

impl Command<SimPawn> for Investigate {
    fn push_policy(&self) -> PushPolicy {
        PushPolicy::replace()
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Investigating")
    }

    fn pushed(&mut self, ctx: &mut CommandContext<'_, SimPawn>) {
        ctx.set_ignore_notifications(true);
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, SimPawn>) -> Flow {
        match offset(ctx) {
            0 => {
                ctx.begin_latent(LATENT_MOVE);
                Flow::Next
            }
            1 => {
                ctx.sleep(self.linger);
                Flow::Next
            }
            _ => {
                ctx.finish(Status::Success);
                Flow::Stop
            }
        }
    }

    fn poll_latent(
        &mut self,
        latent: LatentId,
        delta_seconds: f32,
        ctx: &mut CommandContext<'_, SimPawn>,
    ) {
        if latent == LATENT_MOVE {
            poll_walk(ctx, self.spot, delta_seconds);
        }
    }

    fn dump_string(&self) -> String {
        format!("Investigate ({:.2}, {:.2})", self.spot.x, self.spot.y)
    }
}

/// Pushes a copy of itself every time it steps.
pub struct Recurse {
    pub depth: u32,
}

impl Command<SimPawn> for Recurse {
    fn push_policy(&self) -> PushPolicy {
        PushPolicy::allow()
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Recursing")
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, SimPawn>) -> Flow {
        if offset(ctx) == 0 {
            let depth = self.depth + 1;
            ctx.push_child_with(Box::new(Recurse { depth }), format!("depth {depth}"));
            Flow::Next
        } else {
            Flow::Stop
        }
    }

    fn dump_string(&self) -> String {
        format!("Recurse depth {}", self.depth)
    }
}

use ai_command::Agent;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Point-mass pawn walking on a plane.
#[derive(Debug, Clone)]
pub struct SimPawn {
    pub position: Vec2,
    /// Units per second.
    pub speed: f32,
    pub clock: f64,
    pub alive: bool,
}

impl SimPawn {
    pub fn new(position: Vec2, speed: f32) -> Self {
        Self {
            position,
            speed,
            clock: 0.0,
            alive: true,
        }
    }

    pub fn advance_clock(&mut self, delta_seconds: f32) {
        self.clock += f64::from(delta_seconds);
    }

    /// Moves toward `target` for `delta_seconds`, snapping onto it once the
    /// stride lands within `tolerance`. Returns true on arrival.
    pub fn step_toward(&mut self, target: Vec2, tolerance: f32, delta_seconds: f32) -> bool {
        let remaining = self.position.distance(target);
        if remaining <= tolerance {
            return true;
        }
        let stride = self.speed * delta_seconds;
        if stride + tolerance >= remaining {
            self.position = target;
            return true;
        }
        let scale = stride / remaining;
        self.position.x += (target.x - self.position.x) * scale;
        self.position.y += (target.y - self.position.y) * scale;
        false
    }
}

impl Agent for SimPawn {
    fn world_time(&self) -> f64 {
        self.clock
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn name(&self) -> String {
        "sim_pawn".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_at_speed_and_snaps_on_arrival() {
        let mut pawn = SimPawn::new(Vec2::new(0.0, 0.0), 2.0);
        assert!(!pawn.step_toward(Vec2::new(3.0, 0.0), 0.01, 0.5));
        assert!((pawn.position.x - 1.0).abs() < 1e-5);
        assert!(!pawn.step_toward(Vec2::new(3.0, 0.0), 0.01, 0.5));
        assert!(pawn.step_toward(Vec2::new(3.0, 0.0), 0.01, 0.5));
        assert_eq!(pawn.position, Vec2::new(3.0, 0.0));
    }
}

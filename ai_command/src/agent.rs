/// The pawn a controller drives.
///
/// Commands reach it through their context; the controller reads its clock
/// for history timestamps and checks liveness before every command step.
pub trait Agent: 'static {
    /// Current world time in seconds.
    fn world_time(&self) -> f64;

    fn is_alive(&self) -> bool {
        true
    }

    /// Label used in warnings.
    fn name(&self) -> String {
        "pawn".to_string()
    }
}

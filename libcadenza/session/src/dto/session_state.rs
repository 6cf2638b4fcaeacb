use strum::Display;

/// Scheduler state as observed between ticks.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Joining,
    Playing,
    Paused,
    Stopping,
}

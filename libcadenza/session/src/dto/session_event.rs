use strum::Display;

use crate::transport::TransportError;

/// Notifications for the command surface to render. Every user-visible
/// outcome that does not come back as a return value is emitted here.
#[derive(Clone, Debug, Display)]
pub enum SessionEvent {
    NowPlaying(String),
    QueueUpdated(Vec<String>),
    TrackEnded { error: Option<TransportError> },
    Paused,
    Resumed,
    Skipped,
    LoopToggled(bool),
    JoinFailed(TransportError),
    Stopped(StopReason),
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum StopReason {
    /// A stop command was issued.
    Requested,
    /// Nothing left to play.
    QueueDrained,
    /// No human listener remained in the channel.
    NoListeners,
}

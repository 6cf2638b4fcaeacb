use crate::dto::track::Track;
use crate::transport::{TransportError, VoiceContext};

#[derive(Debug)]
pub(crate) enum Command {
    StartPlayback(VoiceContext),
    Enqueue(Track),
    GetQueue,
    Skip,
    ClearQueue,
    Stop,
    ToggleLoop,
    Pause,
    Resume,
    GetCurrentStatus,
    // Posted by the transport's finish callback. The handler only reports;
    // the next tick observes the idle transport and advances.
    PlaybackEnded(Option<TransportError>),
    Shutdown,
}

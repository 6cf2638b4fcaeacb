use async_trait::async_trait;
use thiserror::Error;

use crate::dto::track::AudioHandle;

/// Which guild this session is bound to and which user asked for playback.
/// The transport resolves the initiator's current voice channel at join
/// time, so a context stays valid while the user moves between channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceContext {
    pub guild_id: u64,
    pub initiator: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("initiating user is not connected to a voice channel")]
    NotInVoiceChannel,
    #[error("voice transport failure: {0}")]
    Other(String),
}

/// Invoked exactly once when the transport finishes (or abandons) the
/// current handle. Runs in whatever context the transport calls it from, so
/// it must not touch session state; reporting back to the command loop is
/// done by posting a message.
pub type FinishedCallback = Box<dyn FnOnce(Option<TransportError>) + Send + 'static>;

/// The device that joins voice channels and streams audio. Treated as an
/// opaque side-effecting collaborator; the scheduler polls `is_playing`
/// instead of trusting completion events for state transitions.
#[async_trait]
pub trait VoiceTransport: Send + 'static {
    /// Connects to the voice channel the context's initiator is in.
    async fn join(&mut self, context: &VoiceContext) -> Result<(), TransportError>;

    /// Vacates the current channel but keeps the device usable.
    async fn leave(&mut self) -> Result<(), TransportError>;

    /// Tears the voice connection down entirely.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Members currently in the joined channel, the bot included.
    fn channel_member_count(&self) -> usize;

    /// Whether a track is audibly in flight. Must report `false` while
    /// paused.
    fn is_playing(&self) -> bool;

    /// Starts streaming the handle from the beginning.
    async fn play(
        &mut self,
        handle: &AudioHandle,
        on_finished: FinishedCallback,
    ) -> Result<(), TransportError>;

    /// Cancels the in-flight track, firing its finish callback.
    async fn stop_current(&mut self) -> Result<(), TransportError>;

    async fn pause(&mut self) -> Result<(), TransportError>;

    async fn resume(&mut self) -> Result<(), TransportError>;
}

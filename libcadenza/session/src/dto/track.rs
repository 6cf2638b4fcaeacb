use std::time::Duration;

/// An opaque locator for a resource the voice transport can stream.
///
/// The scheduler never looks inside; it only hands the value back to
/// [`VoiceTransport::play`](crate::transport::VoiceTransport::play).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle(pub String);

/// A fully resolved, playable track. Immutable once produced by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub handle: AudioHandle,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub uploader: Option<String>,
    pub webpage_url: Option<String>,
    pub duration: Option<Duration>,
}

mod yt_dlp;

use async_trait::async_trait;
use thiserror::Error;
pub use yt_dlp::*;

use crate::dto::track::Track;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The locator was rejected before any remote call was made.
    #[error("not a supported locator: {0}")]
    InvalidLocator(String),
    /// The remote extraction ran and failed.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Turns a user-supplied locator into a playable track. Implementations are
/// remote calls with unbounded latency; the session runs them on the
/// caller's task, never inside the tick loop.
#[async_trait]
pub trait TrackResolver {
    async fn resolve(&self, locator: &str) -> Result<Track, ResolveError>;
}

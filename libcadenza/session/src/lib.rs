mod dto;
mod event_loop;
mod mock_transport;
mod queue;
mod reply_channel;
mod resolver;
mod session;
mod settings;
mod transport;

pub use mock_transport::{MockController, MockTransport};

pub mod cadenza_session {
    use std::sync::Arc;

    use thiserror::Error;
    use tokio::sync::broadcast;
    use tracing::info;

    use crate::dto::command::Command;
    pub use crate::dto::session_event::{SessionEvent, StopReason};
    use crate::dto::session_response::SessionResponse;
    pub use crate::dto::session_state::SessionState;
    pub use crate::dto::session_status::SessionStatus;
    pub use crate::dto::track::{AudioHandle, Metadata, Track};
    use crate::event_loop::main_loop;
    use crate::reply_channel::{RequestSender, reply_channel};
    pub use crate::resolver::{ResolveError, TrackResolver, YtDlpResolver};
    use crate::session::Session;
    pub use crate::settings::Settings;
    pub use crate::transport::{FinishedCallback, TransportError, VoiceContext, VoiceTransport};

    #[derive(Debug, Clone, Error)]
    pub enum SessionError {
        #[error("invalid locator: {0}")]
        InvalidLocator(String),
        #[error("could not resolve locator: {0}")]
        Resolution(String),
        #[error("initiating user is not in a voice channel")]
        NotInVoiceChannel,
        #[error("voice transport failure: {0}")]
        Transport(String),
        #[error("session is no longer running")]
        Closed,
    }

    impl From<ResolveError> for SessionError {
        fn from(e: ResolveError) -> Self {
            match e {
                ResolveError::InvalidLocator(locator) => SessionError::InvalidLocator(locator),
                ResolveError::Extraction(message) => SessionError::Resolution(message),
            }
        }
    }

    impl From<TransportError> for SessionError {
        fn from(e: TransportError) -> Self {
            match e {
                TransportError::NotInVoiceChannel => SessionError::NotInVoiceChannel,
                TransportError::Other(message) => SessionError::Transport(message),
            }
        }
    }

    /// One playback session for one voice context.
    ///
    /// Construction spawns the command loop that owns all mutable state;
    /// this handle only sends commands and queries into it. Multiple guilds
    /// are served by independent instances.
    pub struct CadenzaSession {
        cmd_sender: RequestSender<Command, SessionResponse>,
        event_tx: broadcast::Sender<SessionEvent>,
        resolver: Arc<dyn TrackResolver + Send + Sync>,
    }

    impl CadenzaSession {
        pub fn new<T: VoiceTransport>(
            transport: T,
            resolver: impl TrackResolver + Send + Sync + 'static,
            settings: Settings,
        ) -> Self {
            let (event_tx, _) = broadcast::channel(32);
            let (cmd_tx, cmd_rx) = reply_channel();
            let session = Session::new(transport, settings, event_tx.clone(), cmd_tx.clone());
            tokio::spawn(main_loop(cmd_rx, session));

            CadenzaSession {
                cmd_sender: cmd_tx,
                event_tx,
                resolver: Arc::new(resolver),
            }
        }

        /// Notifications intended for the command surface (now-playing
        /// announcements, stop reasons, failures).
        pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
            self.event_tx.subscribe()
        }

        /// Enables playback and binds the session to the caller's voice
        /// context. Joining happens on the next tick.
        pub async fn start_playback(&self, context: VoiceContext) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::StartPlayback(context))
                .await
                .map_err(|_| SessionError::Closed)
        }

        /// Resolves the locator, then appends the track. Resolution runs on
        /// the caller's task so a slow extraction never stalls the
        /// scheduler; a failed resolution leaves the queue untouched.
        /// Returns the resolved title.
        pub async fn enqueue(&self, locator: &str) -> Result<String, SessionError> {
            let track = self.resolver.resolve(locator).await?;
            let title = track.title.clone();
            self.cmd_sender
                .send_async(Command::Enqueue(track))
                .await
                .map_err(|_| SessionError::Closed)?;
            Ok(title)
        }

        /// Pending titles in play order.
        pub async fn list_queue(&self) -> Result<Vec<String>, SessionError> {
            match self.cmd_sender.request(Command::GetQueue).await {
                Ok(SessionResponse::QueueResponse(titles)) => Ok(titles),
                Ok(_) => unreachable!("GetQueue always answers with QueueResponse"),
                Err(_) => Err(SessionError::Closed),
            }
        }

        pub async fn skip(&self) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::Skip)
                .await
                .map_err(|_| SessionError::Closed)
        }

        pub async fn clear_queue(&self) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::ClearQueue)
                .await
                .map_err(|_| SessionError::Closed)
        }

        pub async fn stop(&self) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::Stop)
                .await
                .map_err(|_| SessionError::Closed)
        }

        /// Flips looping and returns the new value.
        pub async fn toggle_loop(&self) -> Result<bool, SessionError> {
            match self.cmd_sender.request(Command::ToggleLoop).await {
                Ok(SessionResponse::LoopingResponse(looping)) => Ok(looping),
                Ok(_) => unreachable!("ToggleLoop always answers with LoopingResponse"),
                Err(_) => Err(SessionError::Closed),
            }
        }

        pub async fn pause(&self) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::Pause)
                .await
                .map_err(|_| SessionError::Closed)
        }

        pub async fn resume(&self) -> Result<(), SessionError> {
            self.cmd_sender
                .send_async(Command::Resume)
                .await
                .map_err(|_| SessionError::Closed)
        }

        pub async fn current_status(&self) -> Result<SessionStatus, SessionError> {
            match self.cmd_sender.request(Command::GetCurrentStatus).await {
                Ok(SessionResponse::StatusResponse(status)) => Ok(status),
                Ok(_) => unreachable!("GetCurrentStatus always answers with StatusResponse"),
                Err(_) => Err(SessionError::Closed),
            }
        }

        /// Stops playback and terminates the command loop.
        pub async fn shutdown(self) -> Result<(), SessionError> {
            info!("shutting down session");
            self.cmd_sender
                .send_async(Command::Stop)
                .await
                .map_err(|_| SessionError::Closed)?;
            self.cmd_sender
                .send_async(Command::Shutdown)
                .await
                .map_err(|_| SessionError::Closed)
        }
    }
}

#[cfg(test)]
#[path = "./lib_test.rs"]
mod lib_test;

use tap::TapFallible;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::dto::command::Command;
use crate::dto::session_event::{SessionEvent, StopReason};
use crate::dto::session_response::SessionResponse;
use crate::dto::session_state::SessionState;
use crate::dto::session_status::SessionStatus;
use crate::dto::track::Track;
use crate::queue::TrackQueue;
use crate::reply_channel::RequestSender;
use crate::settings::Settings;
use crate::transport::{FinishedCallback, TransportError, VoiceContext, VoiceTransport};

/// Per-voice-context playback state and the tick algorithm that drives it.
///
/// Owned exclusively by the command loop task; everything here runs under
/// that single-writer discipline, so flag reads and queue mutations never
/// race with command handlers.
pub(crate) struct Session<T: VoiceTransport> {
    transport: T,
    queue: TrackQueue,
    current_track: Option<Track>,
    voice_context: Option<VoiceContext>,
    enabled: bool,
    paused: bool,
    looping: bool,
    state: SessionState,
    settings: Settings,
    event_tx: broadcast::Sender<SessionEvent>,
    cmd_tx: RequestSender<Command, SessionResponse>,
}

impl<T: VoiceTransport> Session<T> {
    pub(crate) fn new(
        transport: T,
        settings: Settings,
        event_tx: broadcast::Sender<SessionEvent>,
        cmd_tx: RequestSender<Command, SessionResponse>,
    ) -> Self {
        Self {
            transport,
            queue: TrackQueue::new(),
            current_track: None,
            voice_context: None,
            enabled: false,
            paused: false,
            looping: false,
            state: SessionState::Idle,
            settings,
            event_tx,
            cmd_tx,
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; events are best-effort notifications.
        self.event_tx.send(event).ok();
    }

    /// One scheduler step. Runs to completion; overlapping ticks are skipped
    /// by the interval driving it.
    pub(crate) async fn tick(&mut self) {
        if !self.enabled {
            return;
        }
        let Some(context) = self.voice_context else {
            // Enabled without a binding cannot make progress.
            self.enabled = false;
            return;
        };

        if self.state == SessionState::Idle {
            self.state = SessionState::Joining;
            if let Err(e) = self.transport.join(&context).await {
                warn!("could not join voice channel: {e}");
                self.enabled = false;
                self.state = SessionState::Idle;
                self.emit(SessionEvent::JoinFailed(e));
                return;
            }
        }

        // Nobody listening is resource reclamation, not an error, and it
        // applies no matter what is queued.
        if self.transport.channel_member_count() < self.settings.autoleave_threshold {
            info!("no listeners left in channel, stopping");
            self.stop(StopReason::NoListeners).await;
            return;
        }

        if self.transport.is_playing() || self.paused {
            return;
        }

        let Some(track) = self.select_next() else {
            self.stop(StopReason::QueueDrained).await;
            return;
        };
        self.start_track(track).await;
    }

    /// Looping replays the current track from the beginning without
    /// dequeuing; otherwise the oldest queued track becomes current.
    fn select_next(&mut self) -> Option<Track> {
        if self.looping {
            if let Some(current) = &self.current_track {
                return Some(current.clone());
            }
        }
        let next = self.queue.take_next()?;
        self.current_track = Some(next.clone());
        Some(next)
    }

    async fn start_track(&mut self, track: Track) {
        let cmd_tx = self.cmd_tx.clone();
        // The callback only reports; state converges on the next poll tick.
        let on_finished: FinishedCallback = Box::new(move |ended| {
            if let Some(e) = &ended {
                error!("playback error: {e}");
            }
            cmd_tx
                .send(Command::PlaybackEnded(ended))
                .tap_err(|e| warn!("could not report track end: {e}"))
                .ok();
        });

        match self.transport.play(&track.handle, on_finished).await {
            Ok(()) => {
                self.state = SessionState::Playing;
                info!("now playing {}", track.title);
                self.emit(SessionEvent::NowPlaying(track.title));
            }
            Err(e) => {
                // A track that fails to start is treated like one that
                // finished; the next tick moves on.
                error!("failed to start playback: {e}");
                self.emit(SessionEvent::TrackEnded { error: Some(e) });
            }
        }
    }

    pub(crate) fn start_playback(&mut self, context: VoiceContext) {
        info!("playback enabled for guild {}", context.guild_id);
        self.voice_context = Some(context);
        self.enabled = true;
    }

    pub(crate) fn enqueue(&mut self, track: Track) {
        info!("queued {}", track.title);
        self.queue.push(track);
        self.emit(SessionEvent::QueueUpdated(self.queue.titles()));
    }

    pub(crate) fn queue_titles(&self) -> Vec<String> {
        self.queue.titles()
    }

    pub(crate) fn clear_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        self.queue.clear();
        self.emit(SessionEvent::QueueUpdated(self.queue.titles()));
    }

    /// Cancels the in-flight track; the next tick's selection step advances
    /// (or replays, when looping).
    pub(crate) async fn skip(&mut self) {
        self.paused = false;
        self.transport
            .stop_current()
            .await
            .tap_err(|e| warn!("could not stop current track: {e}"))
            .ok();
        self.emit(SessionEvent::Skipped);
    }

    /// Flips looping. Takes effect at the next selection step; never
    /// restarts an in-flight track.
    pub(crate) fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        info!("looping set to {}", self.looping);
        self.emit(SessionEvent::LoopToggled(self.looping));
        self.looping
    }

    pub(crate) async fn pause(&mut self) {
        if self.paused || !self.transport.is_playing() {
            return;
        }
        if self
            .transport
            .pause()
            .await
            .tap_err(|e| warn!("could not pause: {e}"))
            .is_ok()
        {
            self.paused = true;
            self.state = SessionState::Paused;
            self.emit(SessionEvent::Paused);
        }
    }

    pub(crate) async fn resume(&mut self) {
        if !self.paused {
            return;
        }
        if self
            .transport
            .resume()
            .await
            .tap_err(|e| warn!("could not resume: {e}"))
            .is_ok()
        {
            self.paused = false;
            self.state = SessionState::Playing;
            self.emit(SessionEvent::Resumed);
        }
    }

    /// Disables playback, resets the session to idle and disconnects the
    /// transport. Stopping an already-idle session is a no-op.
    pub(crate) async fn stop(&mut self, reason: StopReason) {
        if !self.enabled
            && self.state == SessionState::Idle
            && self.current_track.is_none()
            && self.voice_context.is_none()
        {
            return;
        }

        self.state = SessionState::Stopping;
        self.enabled = false;
        self.paused = false;
        self.current_track = None;
        self.voice_context = None;
        self.transport
            .disconnect()
            .await
            .tap_err(|e| warn!("error disconnecting voice transport: {e}"))
            .ok();
        self.state = SessionState::Idle;
        info!("session stopped: {reason}");
        self.emit(SessionEvent::Stopped(reason));
    }

    /// Handler for the transport's finish report. Reporting only; the tick
    /// loop owns all state transitions.
    pub(crate) fn on_playback_ended(&mut self, error: Option<TransportError>) {
        match &error {
            Some(e) => error!("track ended with error: {e}"),
            None => info!("track ended"),
        }
        self.emit(SessionEvent::TrackEnded { error });
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            looping: self.looping,
            now_playing: self.current_track.as_ref().map(|t| t.title.clone()),
            queued: self.queue.len(),
        }
    }
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::dto::track::AudioHandle;
use crate::transport::{FinishedCallback, TransportError, VoiceContext, VoiceTransport};

#[derive(Default)]
struct MockState {
    connected: bool,
    members: usize,
    deny_join: bool,
    playing: Option<AudioHandle>,
    paused: bool,
    on_finished: Option<FinishedCallback>,
    played: Vec<AudioHandle>,
}

/// In-memory voice transport for tests and downstream consumers that need a
/// scriptable device. The [`MockController`] half manipulates channel
/// membership and track completion from outside the session loop.
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockController) {
        let state = Arc::new(Mutex::new(MockState {
            members: 2,
            ..MockState::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            MockController { state },
        )
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn join(&mut self, _context: &VoiceContext) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.deny_join {
            return Err(TransportError::NotInVoiceChannel);
        }
        state.connected = true;
        Ok(())
    }

    async fn leave(&mut self) -> Result<(), TransportError> {
        self.disconnect().await
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.playing = None;
        state.paused = false;
        // The in-flight callback is dropped, not fired; the session is gone.
        state.on_finished = None;
        Ok(())
    }

    fn channel_member_count(&self) -> usize {
        self.state.lock().unwrap().members
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.playing.is_some() && !state.paused
    }

    async fn play(
        &mut self,
        handle: &AudioHandle,
        on_finished: FinishedCallback,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(TransportError::Other("not connected".to_owned()));
        }
        state.playing = Some(handle.clone());
        state.paused = false;
        state.played.push(handle.clone());
        state.on_finished = Some(on_finished);
        Ok(())
    }

    async fn stop_current(&mut self) -> Result<(), TransportError> {
        let callback = {
            let mut state = self.state.lock().unwrap();
            state.playing = None;
            state.paused = false;
            state.on_finished.take()
        };
        if let Some(callback) = callback {
            callback(None);
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.playing.is_some() {
            state.paused = true;
        }
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().paused = false;
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockController {
    pub fn set_members(&self, members: usize) {
        self.state.lock().unwrap().members = members;
    }

    pub fn deny_join(&self, deny: bool) {
        self.state.lock().unwrap().deny_join = deny;
    }

    /// Completes the in-flight track as a natural end.
    pub fn finish_current(&self) {
        self.end_current(None);
    }

    /// Completes the in-flight track with a playback error.
    pub fn fail_current(&self, message: &str) {
        self.end_current(Some(TransportError::Other(message.to_owned())));
    }

    fn end_current(&self, error: Option<TransportError>) {
        let callback = {
            let mut state = self.state.lock().unwrap();
            state.playing = None;
            state.paused = false;
            state.on_finished.take()
        };
        if let Some(callback) = callback {
            callback(error);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Every handle the transport was asked to play, in order.
    pub fn played(&self) -> Vec<AudioHandle> {
        self.state.lock().unwrap().played.clone()
    }
}

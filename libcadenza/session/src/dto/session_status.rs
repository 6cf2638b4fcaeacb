use super::session_state::SessionState;

#[derive(Clone, Debug)]
pub struct SessionStatus {
    pub state: SessionState,
    pub looping: bool,
    pub now_playing: Option<String>,
    pub queued: usize,
}

use super::session_status::SessionStatus;

#[derive(Debug)]
pub(crate) enum SessionResponse {
    QueueResponse(Vec<String>),
    StatusResponse(SessionStatus),
    LoopingResponse(bool),
}

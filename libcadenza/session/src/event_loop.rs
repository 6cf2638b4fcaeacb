use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::dto::command::Command;
use crate::dto::session_event::StopReason;
use crate::dto::session_response::SessionResponse;
use crate::reply_channel::RequestReceiver;
use crate::session::Session;
use crate::transport::VoiceTransport;

/// Owns the session and serializes every mutation: command handlers and the
/// scheduler tick are arms of one `select!`, so at most one of them runs at
/// a time and a dequeue can never race an append.
pub(crate) async fn main_loop<T: VoiceTransport>(
    mut receiver: RequestReceiver<Command, SessionResponse>,
    mut session: Session<T>,
) {
    let mut ticker = time::interval(session.settings().tick_interval);
    // A tick that comes due while the loop is busy is dropped, not queued.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = receiver.recv_async() => {
                let Ok(command) = command else {
                    info!("all command senders dropped, terminating");
                    break;
                };
                info!("got command {command:?}");
                match command {
                    Command::StartPlayback(context) => session.start_playback(context),
                    Command::Enqueue(track) => session.enqueue(track),
                    Command::GetQueue => {
                        receiver.reply(SessionResponse::QueueResponse(session.queue_titles()));
                    }
                    Command::Skip => session.skip().await,
                    Command::ClearQueue => session.clear_queue(),
                    Command::Stop => session.stop(StopReason::Requested).await,
                    Command::ToggleLoop => {
                        let looping = session.toggle_loop();
                        receiver.reply(SessionResponse::LoopingResponse(looping));
                    }
                    Command::Pause => session.pause().await,
                    Command::Resume => session.resume().await,
                    Command::GetCurrentStatus => {
                        receiver.reply(SessionResponse::StatusResponse(session.status()));
                    }
                    Command::PlaybackEnded(error) => session.on_playback_ended(error),
                    Command::Shutdown => break,
                }
            }
            _ = ticker.tick() => session.tick().await,
        }
    }
    info!("session loop completed");
}

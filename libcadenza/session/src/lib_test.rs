use std::time::Duration;

use assert_matches::*;
use async_trait::async_trait;
use futures::Future;
use pretty_assertions::assert_eq;
use rstest::*;
use tokio::sync::broadcast;
use tokio::time::{error::Elapsed, timeout};

use crate::cadenza_session::{
    AudioHandle, CadenzaSession, Metadata, ResolveError, SessionError, SessionEvent, SessionState,
    Settings, StopReason, Track, TrackResolver, TransportError, VoiceContext,
};
use crate::{MockController, MockTransport};

#[ctor::ctor]
fn init() {
    tracing_subscriber::fmt()
        .pretty()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_test_writer()
        .init();
}

#[async_trait]
trait TimedFut<T> {
    async fn timed_recv(&mut self) -> T;
}

#[async_trait]
impl<T: Clone + Send> TimedFut<Option<T>> for broadcast::Receiver<T> {
    async fn timed_recv(&mut self) -> Option<T> {
        timed_await(self.recv()).await.unwrap().ok()
    }
}

async fn timed_await<T>(future: T) -> Result<T::Output, Elapsed>
where
    T: Future,
{
    timeout(Duration::from_secs(5), future).await
}

/// Resolver with scripted outcomes: `track://<title>` resolves, an
/// `unreachable://` locator fails remotely, everything else is rejected
/// before any remote call.
struct ScriptedResolver;

#[async_trait]
impl TrackResolver for ScriptedResolver {
    async fn resolve(&self, locator: &str) -> Result<Track, ResolveError> {
        if let Some(title) = locator.strip_prefix("track://") {
            Ok(Track {
                title: title.to_owned(),
                handle: AudioHandle(format!("stream://{title}")),
                metadata: Metadata::default(),
            })
        } else if locator.starts_with("unreachable://") {
            Err(ResolveError::Extraction("remote extraction failed".to_owned()))
        } else {
            Err(ResolveError::InvalidLocator(locator.to_owned()))
        }
    }
}

fn test_settings() -> Settings {
    Settings {
        tick_interval: Duration::from_millis(10),
        ..Settings::default()
    }
}

fn context() -> VoiceContext {
    VoiceContext {
        guild_id: 1,
        initiator: 99,
    }
}

fn init_session() -> (
    CadenzaSession,
    broadcast::Receiver<SessionEvent>,
    MockController,
) {
    let (transport, controller) = MockTransport::new();
    let session = CadenzaSession::new(transport, ScriptedResolver, test_settings());
    let receiver = session.subscribe();
    (session, receiver, controller)
}

fn now_playing(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::NowPlaying(_))
}

fn stopped(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Stopped(_))
}

async fn wait_for<F>(receiver: &mut broadcast::Receiver<SessionEvent>, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    loop {
        let event = receiver
            .timed_recv()
            .await
            .expect("event stream ended before the expected event");
        if pred(&event) {
            return event;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn plays_queue_in_arrival_order() {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://first").await.unwrap();
    session.enqueue("track://second").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "first");
    assert_eq!(session.list_queue().await.unwrap(), vec!["second"]);

    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Playing);
    assert_eq!(status.now_playing.as_deref(), Some("first"));
    assert_eq!(status.queued, 1);

    session.skip().await.unwrap();
    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "second");
    assert!(session.list_queue().await.unwrap().is_empty());

    assert_eq!(
        controller.played(),
        vec![
            AudioHandle("stream://first".to_owned()),
            AudioHandle("stream://second".to_owned())
        ]
    );
    session.shutdown().await.unwrap();
}

#[rstest(replays, case(1), case(3))]
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn looping_replays_current_track(replays: usize) {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://looped").await.unwrap();
    session.enqueue("track://after").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "looped");
    assert!(session.toggle_loop().await.unwrap());

    for _ in 0..replays {
        controller.finish_current();
        let event = wait_for(&mut receiver, now_playing).await;
        assert_matches!(event, SessionEvent::NowPlaying(title) if title == "looped");
    }
    // The queued follow-up was never consumed while looping.
    assert_eq!(session.list_queue().await.unwrap(), vec!["after"]);

    assert!(!session.toggle_loop().await.unwrap());
    controller.finish_current();
    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "after");
    assert!(session.list_queue().await.unwrap().is_empty());
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn leaves_when_no_listeners_remain() {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://alpha").await.unwrap();
    session.enqueue("track://beta").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "alpha");

    controller.set_members(1);
    let event = wait_for(&mut receiver, stopped).await;
    assert_matches!(event, SessionEvent::Stopped(StopReason::NoListeners));

    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Idle);
    assert_eq!(status.now_playing, None);
    assert!(!controller.is_connected());
    // The queue survives the stop; a fresh start picks it back up.
    assert_eq!(session.list_queue().await.unwrap(), vec!["beta"]);

    controller.set_members(2);
    session.start_playback(context()).await.unwrap();
    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "beta");
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn empty_queue_stops_and_disables() {
    let (session, mut receiver, controller) = init_session();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, stopped).await;
    assert_matches!(event, SessionEvent::Stopped(StopReason::QueueDrained));

    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Idle);
    assert_eq!(status.now_playing, None);
    assert!(!controller.is_connected());
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn stop_twice_matches_stop_once() {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://single").await.unwrap();
    session.start_playback(context()).await.unwrap();
    wait_for(&mut receiver, now_playing).await;

    session.stop().await.unwrap();
    let event = wait_for(&mut receiver, stopped).await;
    assert_matches!(event, SessionEvent::Stopped(StopReason::Requested));

    session.stop().await.unwrap();
    let extra = timeout(Duration::from_millis(100), receiver.recv()).await;
    assert!(extra.is_err(), "second stop must not produce events");

    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Idle);
    assert_eq!(status.now_playing, None);
    assert!(!controller.is_connected());
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_resolution_never_reaches_queue() {
    let (session, _receiver, _controller) = init_session();
    session.enqueue("track://kept").await.unwrap();

    assert_matches!(
        session.enqueue("unreachable://gone").await,
        Err(SessionError::Resolution(_))
    );
    assert_matches!(
        session.enqueue("not even a locator").await,
        Err(SessionError::InvalidLocator(_))
    );

    assert_eq!(session.list_queue().await.unwrap(), vec!["kept"]);
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn join_failure_reports_and_disables() {
    let (session, mut receiver, controller) = init_session();
    controller.deny_join(true);
    session.enqueue("track://kept").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, |e| matches!(e, SessionEvent::JoinFailed(_))).await;
    assert_matches!(
        event,
        SessionEvent::JoinFailed(TransportError::NotInVoiceChannel)
    );

    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Idle);

    // Disabled, so no join retries and no further reports.
    let extra = timeout(Duration::from_millis(100), receiver.recv()).await;
    assert!(extra.is_err(), "a disabled session must stay quiet");
    assert_eq!(session.list_queue().await.unwrap(), vec!["kept"]);
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn pause_holds_position_until_resume() {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://held").await.unwrap();
    session.enqueue("track://follow").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "held");

    session.pause().await.unwrap();
    wait_for(&mut receiver, |e| matches!(e, SessionEvent::Paused)).await;

    // Let several ticks elapse; a paused session must not advance.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, SessionState::Paused);
    assert_eq!(status.now_playing.as_deref(), Some("held"));
    assert_eq!(session.list_queue().await.unwrap(), vec!["follow"]);

    session.resume().await.unwrap();
    wait_for(&mut receiver, |e| matches!(e, SessionEvent::Resumed)).await;

    controller.finish_current();
    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "follow");
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn playback_failure_advances_to_next_track() {
    let (session, mut receiver, controller) = init_session();
    session.enqueue("track://doomed").await.unwrap();
    session.enqueue("track://survivor").await.unwrap();
    session.start_playback(context()).await.unwrap();

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "doomed");

    controller.fail_current("stream died");
    let event = wait_for(&mut receiver, |e| {
        matches!(e, SessionEvent::TrackEnded { error: Some(_) })
    })
    .await;
    assert_matches!(
        event,
        SessionEvent::TrackEnded { error: Some(TransportError::Other(message)) } if message == "stream died"
    );

    let event = wait_for(&mut receiver, now_playing).await;
    assert_matches!(event, SessionEvent::NowPlaying(title) if title == "survivor");
    session.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn clear_queue_empties_pending_tracks() {
    let (session, mut receiver, _controller) = init_session();
    session.enqueue("track://one").await.unwrap();
    session.enqueue("track://two").await.unwrap();

    session.clear_queue().await.unwrap();
    wait_for(&mut receiver, |e| {
        matches!(e, SessionEvent::QueueUpdated(titles) if titles.is_empty())
    })
    .await;
    assert!(session.list_queue().await.unwrap().is_empty());
    session.shutdown().await.unwrap();
}

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mediactl::core::{ControllerHandle, spawn_controller};
use mediactl::domain::SessionId;
use mediactl::engine::{
    EngineCommand, EngineEndpoint, EngineRequest, MEDIA_DURATION, PlayOptions, engine_channel,
    state_message, status_message,
};
use mediactl::error::{ControllerError, EngineError};
use mediactl::media::{MediaState, SessionCallbacks, SessionEvent, fade_factor};
use mediactl::settings::ControllerSettings;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Status(MediaState),
    Remaining(f64),
    Success,
    Error(i32),
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn recorder() -> (SessionCallbacks, Log) {
    let log: Log = Arc::default();
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    let callbacks = SessionCallbacks::new()
        .on_status(move |s| a.lock().unwrap().push(Seen::Status(s)))
        .on_position(move |r| b.lock().unwrap().push(Seen::Remaining(r)))
        .on_success(move || c.lock().unwrap().push(Seen::Success))
        .on_error(move |e| d.lock().unwrap().push(Seen::Error(e.code)));
    (callbacks, log)
}

fn statuses(log: &Log) -> Vec<MediaState> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|s| match s {
            Seen::Status(v) => Some(*v),
            _ => None,
        })
        .collect()
}

fn setup() -> (ControllerHandle, EngineEndpoint) {
    let (link, endpoint) = engine_channel(64);
    let (handle, _task) = spawn_controller(ControllerSettings::default(), link);
    (handle, endpoint)
}

/// Lets the controller drain its queues without reaching the next tick.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn next_request(ep: &mut EngineEndpoint) -> EngineRequest {
    ep.rx.recv().await.expect("controller alive")
}

/// Next tracker poll; other requests seen on the way are collected.
async fn next_poll(ep: &mut EngineEndpoint, others: &mut Vec<EngineCommand>) -> EngineRequest {
    loop {
        let req = next_request(ep).await;
        if req.cmd == EngineCommand::GetCurrentPosition {
            return req;
        }
        others.push(req.cmd);
    }
}

async fn create(
    handle: &ControllerHandle,
    ep: &mut EngineEndpoint,
    callbacks: SessionCallbacks,
) -> SessionId {
    let id = handle.create("file:///a.mp3", callbacks).await.expect("create");
    let req = next_request(ep).await;
    assert_eq!(
        req.cmd,
        EngineCommand::Create {
            source: "file:///a.mp3".into()
        }
    );
    ep.reply(&req, Ok(None)).await.expect("reply");
    id
}

async fn start_running(ep: &EngineEndpoint, id: SessionId, duration: f64) {
    ep.post(state_message(id, MediaState::Starting)).await.expect("post");
    ep.post(status_message(id, MEDIA_DURATION, json!(duration)))
        .await
        .expect("post");
    ep.post(state_message(id, MediaState::Running)).await.expect("post");
}

fn gains(cmds: &[EngineCommand]) -> Vec<f64> {
    cmds.iter()
        .filter_map(|c| match c {
            EngineCommand::SetVolume { gain } => Some(*gain),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn natural_end_reports_success_once() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;
    start_running(&ep, id, 100.0).await;

    let mut others = Vec::new();
    for p in [0.0, 25.0, 50.0, 75.0, 100.0] {
        let poll = next_poll(&mut ep, &mut others).await;
        ep.reply(&poll, Ok(Some(p))).await.expect("reply");
    }
    settle().await;

    let seen = log.lock().unwrap().clone();
    let remaining: Vec<f64> = seen
        .iter()
        .filter_map(|s| match s {
            Seen::Remaining(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(remaining, vec![100.0, 75.0, 50.0, 25.0, 0.0]);
    assert_eq!(seen.iter().filter(|s| **s == Seen::Success).count(), 1);
    assert_eq!(
        statuses(&log),
        vec![MediaState::Starting, MediaState::Running, MediaState::Ended]
    );

    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.state, MediaState::Ended);
    assert!(snap.flags.paused);
    assert!(others.is_empty());
}

#[tokio::test(start_paused = true)]
async fn at_most_one_poll_in_flight() {
    let (handle, mut ep) = setup();
    let id = create(&handle, &mut ep, SessionCallbacks::new()).await;
    start_running(&ep, id, 100.0).await;

    let mut others = Vec::new();
    let poll = next_poll(&mut ep, &mut others).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(ep.rx.try_recv().is_err(), "second poll while one is pending");

    ep.reply(&poll, Ok(Some(3.0))).await.expect("reply");
    let again = next_poll(&mut ep, &mut others).await;
    assert_ne!(again.req_id, poll.req_id);
}

#[tokio::test(start_paused = true)]
async fn resume_during_fade_out_is_not_listed_as_running() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;
    handle.set_fade_out(id, true).await.expect("fade");
    settle().await;
    start_running(&ep, id, 100.0).await;

    let mut others = Vec::new();
    let poll = next_poll(&mut ep, &mut others).await;
    ep.reply(&poll, Ok(Some(97.0))).await.expect("reply");
    ep.post(state_message(id, MediaState::Paused)).await.expect("post");
    ep.post(state_message(id, MediaState::Running)).await.expect("post");
    settle().await;

    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.state, MediaState::FadingOut);
    assert!(snap.fading_out);
    assert!(handle.running().await.expect("running").is_empty());
    assert_eq!(
        statuses(&log),
        vec![
            MediaState::Starting,
            MediaState::Running,
            MediaState::FadingOut,
            MediaState::Paused,
            MediaState::FadingOut
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn fade_out_notifies_once_and_stops() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;
    handle.set_fade_out(id, true).await.expect("fade");
    handle.set_fade_time(id, 5.0).await.expect("fade time");
    settle().await;
    start_running(&ep, id, 100.0).await;

    let mut others = Vec::new();
    for p in [94.0, 97.0, 97.5, 98.5] {
        let poll = next_poll(&mut ep, &mut others).await;
        ep.reply(&poll, Ok(Some(p))).await.expect("reply");
    }
    let poll = next_poll(&mut ep, &mut others).await;
    ep.reply(&poll, Ok(Some(99.9))).await.expect("reply");

    let stop = next_request(&mut ep).await;
    assert_eq!(stop.cmd, EngineCommand::StopPlaying);
    ep.reply(&stop, Ok(None)).await.expect("reply");
    ep.post(state_message(id, MediaState::Stopped))
        .await
        .expect("post");
    settle().await;

    assert_eq!(
        statuses(&log),
        vec![
            MediaState::Starting,
            MediaState::Running,
            MediaState::FadingOut,
            MediaState::Stopped
        ]
    );
    let g = gains(&others);
    assert_eq!(g.len(), 3);
    assert!((g[0] - fade_factor(0.6)).abs() < 1e-9);
    assert!((g[1] - fade_factor(0.5)).abs() < 1e-9);
    assert!(g[2] < g[1]);

    let snap = handle.get(id).await.expect("get").expect("session");
    assert!(!snap.fading_out);
    assert_eq!(snap.timing.position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn fade_scales_intended_volume() {
    let (handle, mut ep) = setup();
    let id = create(&handle, &mut ep, SessionCallbacks::new()).await;
    handle.set_volume(id, 0.8).await.expect("volume");
    handle.set_fade_in(id, true).await.expect("fade in");
    handle.set_fade_time(id, 4.0).await.expect("fade time");
    settle().await;
    start_running(&ep, id, 100.0).await;

    let mut others = Vec::new();
    let poll = next_poll(&mut ep, &mut others).await;
    ep.reply(&poll, Ok(Some(2.0))).await.expect("reply");
    next_poll(&mut ep, &mut others).await;

    let g = gains(&others);
    assert_eq!(g[0], 0.8);
    assert!((g[1] - 0.8 * 0.5_f64.sqrt()).abs() < 1e-9);
    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.volume, 0.8);
}

#[tokio::test(start_paused = true)]
async fn released_session_is_silent() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;

    handle.release(id).await.expect("release");
    let req = next_request(&mut ep).await;
    assert_eq!(req.cmd, EngineCommand::Release);
    ep.reply(&req, Ok(None)).await.expect("reply");
    ep.post(state_message(id, MediaState::Running))
        .await
        .expect("post");
    settle().await;

    assert!(log.lock().unwrap().is_empty());
    assert!(handle.get(id).await.expect("get").is_none());
    assert!(handle.list().await.expect("list").is_empty());
    handle.pause(id).await.expect("queued");
    settle().await;
    assert!(ep.rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn terminal_states_before_playback_are_swallowed() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;
    ep.post(state_message(id, MediaState::Ended)).await.expect("post");
    ep.post(state_message(id, MediaState::Stopped)).await.expect("post");
    settle().await;

    assert!(statuses(&log).is_empty());
    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.state, MediaState::None);
}

#[tokio::test(start_paused = true)]
async fn malformed_messages_do_not_stop_the_controller() {
    let (handle, mut ep) = setup();
    ep.post("{not json".to_owned()).await.expect("post");
    ep.post(r#"{"action":"volume"}"#.to_owned())
        .await
        .expect("post");
    ep.post(status_message(SessionId::new(), 1, json!(2)))
        .await
        .expect("post");
    settle().await;

    let id = create(&handle, &mut ep, SessionCallbacks::new()).await;
    assert_eq!(handle.list().await.expect("list").len(), 1);
    assert!(handle.get(id).await.expect("get").is_some());
}

#[tokio::test(start_paused = true)]
async fn create_failure_reaches_error_callback() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = handle.create("", callbacks).await.expect("create");
    let req = next_request(&mut ep).await;
    ep.reply(&req, Err(EngineError::from_code(EngineError::NONE_SUPPORTED)))
        .await
        .expect("reply");
    settle().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![Seen::Error(EngineError::NONE_SUPPORTED)]
    );
    let snap = handle.get(id).await.expect("get").expect("still registered");
    assert_eq!(snap.state, MediaState::None);
}

#[tokio::test(start_paused = true)]
async fn position_query_round_trip() {
    let (handle, mut ep) = setup();
    let id = create(&handle, &mut ep, SessionCallbacks::new()).await;

    let h = handle.clone();
    let query = tokio::spawn(async move { h.get_current_position(id).await });
    let req = next_request(&mut ep).await;
    assert_eq!(req.cmd, EngineCommand::GetCurrentPosition);
    ep.reply(&req, Ok(Some(12.5))).await.expect("reply");

    assert_eq!(query.await.expect("join").expect("position"), 12.5);
    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.timing.position, 12.5);
}

#[tokio::test(start_paused = true)]
async fn media_id_lookup_and_running_list() {
    let (handle, mut ep) = setup();
    let a = create(&handle, &mut ep, SessionCallbacks::new()).await;
    let b = create(&handle, &mut ep, SessionCallbacks::new()).await;
    handle.set_media_id(b, "track-9").await.expect("tag");
    handle.play(b, PlayOptions::default()).await.expect("play");
    let req = next_request(&mut ep).await;
    assert!(matches!(req.cmd, EngineCommand::StartPlaying { .. }));
    start_running(&ep, b, 60.0).await;
    settle().await;

    let found = handle
        .get_by_media_id("track-9")
        .await
        .expect("lookup")
        .expect("found");
    assert_eq!(found.id, b);
    let running: Vec<_> = handle
        .running()
        .await
        .expect("running")
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(running, vec![b]);
    let all: Vec<_> = handle
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(all, vec![a, b]);
}

#[tokio::test(start_paused = true)]
async fn handle_fails_after_shutdown() {
    let (link, _endpoint) = engine_channel(8);
    let (handle, task) = spawn_controller(ControllerSettings::default(), link);
    handle.shutdown().await.expect("shutdown");
    task.await.expect("join");
    assert!(matches!(
        handle.list().await,
        Err(ControllerError::ChannelClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn dispatched_events_reach_the_session() {
    let (handle, mut ep) = setup();
    let (callbacks, log) = recorder();
    let id = create(&handle, &mut ep, callbacks).await;

    handle
        .dispatch(id, SessionEvent::Error(EngineError::from_code(EngineError::NETWORK)))
        .await
        .expect("dispatch");
    handle
        .dispatch(id, SessionEvent::Duration(42.0))
        .await
        .expect("dispatch");
    settle().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![Seen::Error(EngineError::NETWORK)]
    );
    let snap = handle.get(id).await.expect("get").expect("session");
    assert_eq!(snap.timing.duration, 42.0);
}

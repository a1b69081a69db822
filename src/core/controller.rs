use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::effects::{ControllerDispatch, ControllerEffects, run_effects};
use super::handle::ControllerHandle;
use super::messages::{ControllerCommand, FadeChange, RecordingCommand, TagChange, ValueReply};
use super::registry::SessionRegistry;
use super::request_tracker::RequestTracker;
use crate::domain::SessionId;
use crate::engine::{
    EngineAction, EngineCommand, EngineLink, EngineMessage, parse_channel_message,
};
use crate::error::{ControllerError, EngineError};
use crate::media::{Session, SessionEffect, SessionEffects};
use crate::settings::ControllerSettings;

enum CoreMsg {
    Command(ControllerCommand),
    Engine(EngineMessage),
    Tick,
}

/// A caller waiting on the numeric answer of one engine request.
struct Waiter {
    id: SessionId,
    reply: ValueReply,
}

struct ControllerState {
    settings: ControllerSettings,
    registry: SessionRegistry,
    /// Tracker polls in flight, one per session at most.
    polls: RequestTracker<SessionId>,
    waiters: HashMap<u64, Waiter>,
    req_id: u64,
}

impl ControllerState {
    fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            registry: SessionRegistry::new(),
            polls: RequestTracker::new(),
            waiters: HashMap::new(),
            req_id: 1,
        }
    }

    fn next_req_id(&mut self) -> u64 {
        let id = self.req_id;
        self.req_id = self.req_id.wrapping_add(1).max(1);
        id
    }

    /// Turns session effects into controller effects. Tracking starts
    /// right away; everything else is performed by `run_effects`.
    fn absorb(
        &mut self,
        id: SessionId,
        fx: SessionEffects,
        effects: &mut ControllerEffects,
        now: Instant,
    ) {
        for effect in fx {
            match effect {
                SessionEffect::Engine(cmd) => {
                    let req_id = self.next_req_id();
                    effects.send_engine(req_id, id, cmd);
                }
                SessionEffect::Notify(n) => effects.notify(id, n),
                SessionEffect::StartTracking => {
                    if let Some(entry) = self.registry.get_mut(&id)
                        && entry.session.tracker_mut().start(now)
                    {
                        tracing::debug!(id = %id, "position tracking started");
                    }
                }
            }
        }
    }

    fn update(
        &mut self,
        id: SessionId,
        op: &'static str,
        effects: &mut ControllerEffects,
        now: Instant,
        f: impl FnOnce(&mut Session) -> SessionEffects,
    ) {
        let Some(entry) = self.registry.get_mut(&id) else {
            tracing::warn!(id = %id, op, "unknown session, ignored");
            return;
        };
        let fx = f(&mut entry.session);
        self.absorb(id, fx, effects, now);
    }

    fn wait_for_value(
        &mut self,
        id: SessionId,
        cmd: EngineCommand,
        reply: ValueReply,
        effects: &mut ControllerEffects,
    ) {
        if !self.registry.contains(&id) {
            tracing::warn!(id = %id, action = cmd.action().name(), "unknown session, ignored");
            let _ = reply.send(Err(ControllerError::UnknownSession(id)));
            return;
        }
        let req_id = self.next_req_id();
        self.waiters.insert(req_id, Waiter { id, reply });
        effects.send_engine(req_id, id, cmd);
    }

    fn release(&mut self, id: SessionId, effects: &mut ControllerEffects) {
        if self.registry.remove(&id).is_none() {
            tracing::warn!(id = %id, "release of unknown session, ignored");
            return;
        }
        self.polls.clear(&id);
        let req_id = self.next_req_id();
        effects.send_engine(req_id, id, EngineCommand::Release);
        tracing::info!(id = %id, sessions = self.registry.len(), "session released");
    }

    fn handle_command(
        &mut self,
        cmd: ControllerCommand,
        effects: &mut ControllerEffects,
        now: Instant,
    ) -> bool {
        match cmd {
            ControllerCommand::Create {
                source,
                callbacks,
                reply,
            } => {
                let id = SessionId::new();
                let session = Session::new(
                    id,
                    source,
                    self.settings.fade_config(),
                    self.settings.fade_tuning(),
                );
                let create = session.create_command();
                tracing::info!(id = %id, source = %session.source(), "session created");
                self.registry.insert(session, callbacks);
                let req_id = self.next_req_id();
                effects.send_engine(req_id, id, create);
                let _ = reply.send(id);
            }
            ControllerCommand::Dispatch { id, event } => {
                self.update(id, "dispatch", effects, now, |s| s.on_event(event));
            }
            ControllerCommand::Play { id, options } => {
                self.update(id, "play", effects, now, |s| s.play(options));
            }
            ControllerCommand::Pause { id } => self.update(id, "pause", effects, now, Session::pause),
            ControllerCommand::Stop { id } => self.update(id, "stop", effects, now, Session::stop),
            ControllerCommand::SeekTo { id, ms } => {
                self.update(id, "seek", effects, now, |s| s.seek_to(ms));
            }
            ControllerCommand::SetVolume { id, volume } => {
                self.update(id, "set_volume", effects, now, |s| s.set_volume(volume));
            }
            ControllerCommand::SetRate { id, rate } => {
                let supported = self.settings.supports_rate;
                self.update(id, "set_rate", effects, now, |s| s.set_rate(rate, supported));
            }
            ControllerCommand::Fade { id, change } => {
                self.update(id, "fade", effects, now, |s| {
                    match change {
                        FadeChange::FadeIn(v) => s.set_fade_in(v),
                        FadeChange::FadeOut(v) => s.set_fade_out(v),
                        FadeChange::FadeTime(secs) => s.set_fade_time(secs),
                        FadeChange::ForceFadeOut(v) => s.set_force_fade_out(v),
                        FadeChange::FadingOut(v) => s.set_fading_out(v),
                    }
                    SessionEffects::default()
                });
            }
            ControllerCommand::Tag { id, change } => {
                self.update(id, "tag", effects, now, |s| {
                    match change {
                        TagChange::MediaId(v) => s.set_media_id(v),
                        TagChange::InstanceNumber(n) => s.set_instance_number(n),
                        TagChange::PlaylistIndex(i) => s.set_playlist_index(i),
                    }
                    SessionEffects::default()
                });
            }
            ControllerCommand::Recording { id, cmd } => {
                let cmd = match cmd {
                    RecordingCommand::Start { target } => EngineCommand::StartRecording { target },
                    RecordingCommand::Stop => EngineCommand::StopRecording,
                    RecordingCommand::Pause => EngineCommand::PauseRecording,
                    RecordingCommand::Resume => EngineCommand::ResumeRecording,
                };
                self.update(id, "recording", effects, now, |_| {
                    let mut fx = SessionEffects::default();
                    fx.send(cmd);
                    fx
                });
            }
            ControllerCommand::GetCurrentPosition { id, reply } => {
                self.wait_for_value(id, EngineCommand::GetCurrentPosition, reply, effects);
            }
            ControllerCommand::GetCurrentAmplitude { id, reply } => {
                self.wait_for_value(id, EngineCommand::GetCurrentAmplitude, reply, effects);
            }
            ControllerCommand::Release { id } => self.release(id, effects),
            ControllerCommand::Get { id, reply } => {
                let _ = reply.send(self.registry.get(&id).map(|e| e.session.snapshot()));
            }
            ControllerCommand::GetByMediaId { media_id, reply } => {
                let found = self
                    .registry
                    .find_by_media_id(&media_id)
                    .map(|e| e.session.snapshot());
                let _ = reply.send(found);
            }
            ControllerCommand::List { reply } => {
                let _ = reply.send(self.registry.list());
            }
            ControllerCommand::Running { reply } => {
                let _ = reply.send(self.registry.running());
            }
            ControllerCommand::Shutdown => return true,
        }
        false
    }

    fn handle_engine(&mut self, msg: EngineMessage, effects: &mut ControllerEffects, now: Instant) {
        match msg {
            EngineMessage::Channel(raw) => match parse_channel_message(&raw) {
                Ok(status) => {
                    let Some(evt) = status.event() else {
                        tracing::warn!(
                            id = %status.id,
                            msg_type = status.msg_type,
                            value = %status.value,
                            "unhandled status message"
                        );
                        return;
                    };
                    self.update(status.id, "status", effects, now, |s| s.on_event(evt));
                }
                Err(e) => {
                    tracing::error!(err = %e, raw = %raw, "malformed engine message dropped");
                }
            },
            EngineMessage::Reply {
                req_id,
                id,
                action,
                result,
            } => self.handle_reply(req_id, id, action, result, effects, now),
        }
    }

    fn handle_reply(
        &mut self,
        req_id: u64,
        id: SessionId,
        action: EngineAction,
        result: Result<Option<f64>, EngineError>,
        effects: &mut ControllerEffects,
        now: Instant,
    ) {
        if let Some(waiter) = self.waiters.remove(&req_id) {
            if action == EngineAction::GetCurrentPositionAudio
                && result.is_ok()
                && let Some(entry) = self.registry.get_mut(&waiter.id)
            {
                let fx = entry.session.on_ack(action, result.clone());
                self.absorb(waiter.id, fx, effects, now);
            }
            let answer = match result {
                Ok(Some(v)) => Ok(v),
                Ok(None) => Err(ControllerError::Other(format!(
                    "{} returned no value",
                    action.name()
                ))),
                Err(e) => Err(e.into()),
            };
            if waiter.reply.send(answer).is_err() {
                tracing::debug!(id = %waiter.id, req_id, "caller stopped waiting");
            }
            return;
        }

        if action == EngineAction::GetCurrentPositionAudio {
            if !self.polls.accept(&id, req_id) {
                tracing::debug!(id = %id, req_id, "stale position reply dropped");
                return;
            }
            match result {
                Ok(Some(p)) => {
                    self.update(id, "poll", effects, now, |s| s.on_polled_position(p));
                }
                Ok(None) => tracing::warn!(id = %id, "position poll returned no value"),
                Err(e) => {
                    self.update(id, "poll", effects, now, |s| s.on_ack(action, Err(e)));
                }
            }
            return;
        }

        let Some(entry) = self.registry.get_mut(&id) else {
            match result {
                Err(e) => {
                    tracing::warn!(id = %id, action = action.name(), err = %e, "engine command failed for released session");
                }
                Ok(_) => tracing::trace!(id = %id, action = action.name(), "ack for released session"),
            }
            return;
        };
        let fx = entry.session.on_ack(action, result);
        self.absorb(id, fx, effects, now);
    }

    /// Runs every due tracker tick. A session that left the tracking states
    /// loses its schedule; one whose last poll is unanswered skips a beat.
    fn handle_tick(&mut self, effects: &mut ControllerEffects, now: Instant) {
        let interval = self.settings.poll_interval();
        for id in self.registry.due(now) {
            let Some(entry) = self.registry.get_mut(&id) else {
                continue;
            };
            let state = entry.session.state();
            if !entry
                .session
                .tracker_mut()
                .begin_tick(now, interval, state.is_tracking())
            {
                tracing::debug!(id = %id, state = %state, "position tracking stopped");
                continue;
            }
            if self.polls.is_pending(&id) {
                tracing::trace!(id = %id, "previous poll still in flight");
                continue;
            }
            let req_id = self.next_req_id();
            self.polls.issue(id, req_id);
            effects.send_engine(req_id, id, EngineCommand::GetCurrentPosition);
        }
    }
}

fn reduce(
    msg: CoreMsg,
    state: &mut ControllerState,
    effects: &mut ControllerEffects,
    now: Instant,
) -> bool {
    match msg {
        CoreMsg::Command(cmd) => return state.handle_command(cmd, effects, now),
        CoreMsg::Engine(msg) => state.handle_engine(msg, effects, now),
        CoreMsg::Tick => state.handle_tick(effects, now),
    }
    false
}

/// Spawns the controller task. It owns every session and stops when all
/// handles are dropped or on [`ControllerHandle::shutdown`].
pub fn spawn_controller(
    settings: ControllerSettings,
    engine: EngineLink,
) -> (ControllerHandle, JoinHandle<()>) {
    let (tx_cmd, rx_cmd) = mpsc::channel::<ControllerCommand>(64);
    let task = tokio::spawn(run(settings, engine, rx_cmd));
    (ControllerHandle::new(tx_cmd), task)
}

async fn run(
    settings: ControllerSettings,
    engine: EngineLink,
    mut rx_cmd: mpsc::Receiver<ControllerCommand>,
) {
    let EngineLink {
        tx: tx_engine,
        rx: mut rx_engine,
    } = engine;
    let mut state = ControllerState::new(settings);
    let dispatch = ControllerDispatch {
        tx_engine: &tx_engine,
    };
    tracing::info!(
        poll_interval_ms = state.settings.poll_interval_ms,
        "controller started"
    );

    loop {
        let next_tick = state.registry.earliest_tick();
        let far = Instant::now() + Duration::from_secs(3600);
        let msg = tokio::select! {
            maybe_cmd = rx_cmd.recv() => match maybe_cmd {
                Some(cmd) => CoreMsg::Command(cmd),
                None => break,
            },
            Some(msg) = rx_engine.recv() => CoreMsg::Engine(msg),
            _ = sleep_until(next_tick.unwrap_or(far)), if next_tick.is_some() => CoreMsg::Tick,
        };

        let mut effects = ControllerEffects::default();
        let should_quit = reduce(msg, &mut state, &mut effects, Instant::now());
        run_effects(effects, &dispatch, &mut state.registry);
        if should_quit {
            break;
        }
    }

    tracing::info!(sessions = state.registry.len(), "controller stopped");
}

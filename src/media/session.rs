use serde::{Deserialize, Serialize};

use super::effects::{Notification, SessionEffects};
use super::fade::scaled_volume;
use super::fade_control::{FadeAction, FadeConfig, FadeController, FadeTuning};
use super::position::{PositionSnapshot, PositionTracker};
use super::state::{MediaState, StatusFlags};
use crate::domain::SessionId;
use crate::engine::{EngineAction, EngineCommand, PlayOptions};
use crate::error::EngineError;

/// One inbound status event, already decoded from the message channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    State(MediaState),
    Duration(f64),
    Position(f64),
    Error(EngineError),
}

/// Caller-assigned correlation tags. Nothing enforces uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTags {
    pub media_id: String,
    pub instance_number: i64,
    pub playlist_index: Option<usize>,
}

impl Default for SessionTags {
    fn default() -> Self {
        Self {
            media_id: "0".to_owned(),
            instance_number: -1,
            playlist_index: None,
        }
    }
}

/// Read-only copy of a session handed out by registry queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub source: String,
    #[serde(flatten)]
    pub tags: SessionTags,
    pub state: MediaState,
    pub flags: StatusFlags,
    #[serde(flatten)]
    pub timing: PositionSnapshot,
    pub volume: f64,
    pub fade: FadeConfig,
    pub fading_out: bool,
    pub end_position: f64,
}

impl SessionSnapshot {
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }
}

/// State machine of one playback session.
///
/// Every transition is a plain method returning the side effects it wants
/// performed; nothing here talks to the engine or to callers directly.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    source: String,
    tags: SessionTags,
    state: MediaState,
    flags: StatusFlags,
    tracker: PositionTracker,
    volume: f64,
    fade: FadeController,
    /// The end-of-media success notification went out for this run.
    ended_notified: bool,
    /// A fade-out completed and its stop is on the way to the engine.
    fade_stop_pending: bool,
}

impl Session {
    pub fn new(id: SessionId, source: impl Into<String>, fade: FadeConfig, tuning: FadeTuning) -> Self {
        Self {
            id,
            source: source.into(),
            tags: SessionTags::default(),
            state: MediaState::None,
            flags: StatusFlags::default(),
            tracker: PositionTracker::default(),
            volume: 1.0,
            fade: FadeController::new(fade, tuning),
            ended_notified: false,
            fade_stop_pending: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    pub fn flags(&self) -> StatusFlags {
        self.flags
    }

    pub fn tags(&self) -> &SessionTags {
        &self.tags
    }

    pub fn timing(&self) -> PositionSnapshot {
        self.tracker.snapshot()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn fade(&self) -> &FadeController {
        &self.fade
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut PositionTracker {
        &mut self.tracker
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            source: self.source.clone(),
            tags: self.tags.clone(),
            state: self.state,
            flags: self.flags,
            timing: self.tracker.snapshot(),
            volume: self.volume,
            fade: self.fade.config(),
            fading_out: self.fade.fading_out(),
            end_position: self.fade.end_position(),
        }
    }

    pub fn create_command(&self) -> EngineCommand {
        EngineCommand::Create {
            source: self.source.clone(),
        }
    }

    // ---- inbound events ----

    pub fn on_event(&mut self, evt: SessionEvent) -> SessionEffects {
        let mut fx = SessionEffects::default();
        match evt {
            SessionEvent::State(v) => self.apply_state(v, &mut fx),
            SessionEvent::Duration(d) => self.tracker.set_duration(d),
            SessionEvent::Position(p) => self.apply_position(p, &mut fx),
            SessionEvent::Error(e) => fx.notify(Notification::Error(e)),
        }
        fx
    }

    fn apply_state(&mut self, v: MediaState, fx: &mut SessionEffects) {
        if self.state == MediaState::None && matches!(v, MediaState::Ended | MediaState::Stopped) {
            tracing::debug!(id = %self.id, state = %v, "ignoring terminal state before playback");
            return;
        }
        if self.state == MediaState::Ended && v == MediaState::Ended {
            tracing::debug!(id = %self.id, "end already detected from position");
            return;
        }
        if !self.state.can_transition_to(v) {
            tracing::debug!(id = %self.id, from = %self.state, to = %v, "unexpected transition");
        }

        // Resuming inside a fade-out keeps fading: the latch and the state
        // stay together.
        let v = if v == MediaState::Running && self.fade.in_fade_out() {
            tracing::debug!(id = %self.id, "resumed inside fade-out");
            MediaState::FadingOut
        } else {
            v
        };

        self.state = v;
        self.flags = StatusFlags::project(v);
        if !v.is_tracking() {
            self.fade_stop_pending = false;
        }
        match v {
            MediaState::Starting => self.ended_notified = false,
            MediaState::Stopped | MediaState::Ended => self.fade.set_fading_out(false),
            _ => {}
        }

        fx.status(v);
        if v.is_tracking() {
            fx.start_tracking();
        }
    }

    fn apply_position(&mut self, p: f64, fx: &mut SessionEffects) {
        let remaining = self.tracker.apply_position(p);
        fx.notify(Notification::Position { remaining });

        if self.tracker.snapshot().at_end() && self.state != MediaState::Ended {
            tracing::debug!(id = %self.id, position = p, "reached end of media");
            self.state = MediaState::Ended;
            self.flags = StatusFlags::project(MediaState::Ended);
            self.flags.paused = true;
            self.fade.set_fading_out(false);
            fx.status(MediaState::Ended);
            if !self.ended_notified {
                self.ended_notified = true;
                fx.notify(Notification::Success);
            }
        }
    }

    /// A tracker poll came back: apply it like a position event, then run
    /// one fade check while playback is still active.
    pub fn on_polled_position(&mut self, p: f64) -> SessionEffects {
        let mut fx = SessionEffects::default();
        self.apply_position(p, &mut fx);
        if self.state.is_tracking() && !self.fade_stop_pending {
            self.fade_tick(&mut fx);
        }
        fx
    }

    fn fade_tick(&mut self, fx: &mut SessionEffects) {
        for action in self.fade.check(self.tracker.snapshot()) {
            match action {
                FadeAction::EnterFadeOut => {
                    self.state = MediaState::FadingOut;
                    self.flags = StatusFlags::project(MediaState::FadingOut);
                    fx.status(MediaState::FadingOut);
                }
                FadeAction::LeaveFadeOut => {
                    if self.state == MediaState::FadingOut {
                        self.state = MediaState::Running;
                        self.flags = StatusFlags::project(MediaState::Running);
                        fx.status(MediaState::Running);
                    }
                }
                FadeAction::SetGain(g) => fx.send(EngineCommand::SetVolume {
                    gain: scaled_volume(self.volume, g),
                }),
                FadeAction::Complete => {
                    tracing::info!(id = %self.id, media_id = %self.tags.media_id, "fade-out complete, stopping");
                    self.fade_stop_pending = true;
                    fx.append(self.stop());
                }
            }
        }
    }

    /// Acknowledgement of a command this session issued.
    pub fn on_ack(
        &mut self,
        action: EngineAction,
        result: Result<Option<f64>, EngineError>,
    ) -> SessionEffects {
        let mut fx = SessionEffects::default();
        match result {
            Err(e) => {
                tracing::warn!(id = %self.id, action = action.name(), err = %e, "engine command failed");
                fx.notify(Notification::Error(e));
            }
            Ok(value) => match action {
                EngineAction::StopPlayingAudio => self.tracker.set_position(0.0),
                EngineAction::SeekToAudio | EngineAction::GetCurrentPositionAudio => {
                    if let Some(p) = value {
                        self.tracker.set_position(p);
                    }
                }
                _ => {}
            },
        }
        fx
    }

    // ---- commands ----

    /// Starts or resumes playback. The state is left alone: it changes when
    /// the engine reports it.
    pub fn play(&mut self, options: PlayOptions) -> SessionEffects {
        let mut fx = SessionEffects::default();
        if self.fade.is_scaled() && !self.fade.config().fade_in {
            fx.send(EngineCommand::SetVolume { gain: self.volume });
            self.fade.clear_scaled();
        }
        fx.send(EngineCommand::StartPlaying {
            source: self.source.clone(),
            options,
        });
        fx
    }

    pub fn pause(&mut self) -> SessionEffects {
        self.flags.paused = true;
        let mut fx = SessionEffects::default();
        fx.send(EngineCommand::PausePlaying);
        fx
    }

    pub fn stop(&mut self) -> SessionEffects {
        self.fade.reset_latches();
        let mut fx = SessionEffects::default();
        fx.send(EngineCommand::StopPlaying);
        fx
    }

    pub fn seek_to(&mut self, ms: u64) -> SessionEffects {
        let mut fx = SessionEffects::default();
        fx.send(EngineCommand::SeekTo { ms });
        fx
    }

    /// Stores the intended volume and sends it unscaled.
    pub fn set_volume(&mut self, volume: f64) -> SessionEffects {
        let mut fx = SessionEffects::default();
        if volume.is_nan() {
            tracing::warn!(id = %self.id, "ignoring NaN volume");
            return fx;
        }
        tracing::debug!(id = %self.id, volume, previous = self.volume, "volume set");
        self.volume = volume.clamp(0.0, 1.0);
        self.fade.clear_scaled();
        fx.send(EngineCommand::SetVolume { gain: self.volume });
        fx
    }

    pub fn set_rate(&mut self, rate: f64, supported: bool) -> SessionEffects {
        let mut fx = SessionEffects::default();
        if supported {
            fx.send(EngineCommand::SetRate { rate });
        } else {
            tracing::warn!(id = %self.id, rate, "setRate is not supported by this engine");
        }
        fx
    }

    pub fn set_fade_in(&mut self, v: bool) {
        self.fade.set_fade_in(v);
    }

    pub fn set_fade_out(&mut self, v: bool) {
        self.fade.set_fade_out(v);
    }

    pub fn set_fade_time(&mut self, secs: f64) {
        self.fade.set_window(secs);
    }

    pub fn set_force_fade_out(&mut self, v: bool) {
        self.fade.set_force_fade_out(v, self.tracker.snapshot());
    }

    pub fn set_fading_out(&mut self, v: bool) {
        self.fade.set_fading_out(v);
    }

    pub fn set_media_id(&mut self, media_id: impl Into<String>) {
        self.tags.media_id = media_id.into();
    }

    pub fn set_instance_number(&mut self, n: i64) {
        self.tags.instance_number = n;
    }

    pub fn set_playlist_index(&mut self, index: Option<usize>) {
        self.tags.playlist_index = index;
    }
}

//! In-process engine with a virtual clock.
//!
//! Every session plays a silent clip of a fixed length. Position advances
//! with tokio time, so tests running on a paused clock see exact values.

use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::select;
use tokio::time::{Instant, sleep_until};

use super::{
    EngineCommand, EngineEndpoint, EngineLink, EngineRequest, MEDIA_DURATION, MEDIA_POSITION,
    engine_channel, state_message, status_message,
};
use crate::domain::SessionId;
use crate::error::EngineError;
use crate::media::MediaState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub duration_secs: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recording {
    Idle,
    Active,
    Paused,
}

#[derive(Debug)]
struct SimPlayer {
    duration: f64,
    /// Seconds played up to `started_at`.
    offset: f64,
    started_at: Option<Instant>,
    rate: f64,
    volume: f64,
    recording: Recording,
    announced_duration: bool,
}

impl SimPlayer {
    fn new(duration: f64) -> Self {
        Self {
            duration,
            offset: 0.0,
            started_at: None,
            rate: 1.0,
            volume: 1.0,
            recording: Recording::Idle,
            announced_duration: false,
        }
    }

    fn position(&self, now: Instant) -> f64 {
        let played = self
            .started_at
            .map(|t| now.saturating_duration_since(t).as_secs_f64() * self.rate)
            .unwrap_or(0.0);
        (self.offset + played).min(self.duration)
    }

    /// When playback reaches the end; `None` while stopped, or when the end
    /// is too far away to schedule.
    fn end_at(&self) -> Option<Instant> {
        let started = self.started_at?;
        let left = ((self.duration - self.offset) / self.rate).max(0.0);
        let left = Duration::try_from_secs_f64(left).ok()?;
        started.checked_add(left)
    }

    fn freeze(&mut self, now: Instant) {
        self.offset = self.position(now);
        self.started_at = None;
    }
}

struct SimEngine {
    endpoint: EngineEndpoint,
    config: SimConfig,
    players: HashMap<SessionId, SimPlayer>,
}

impl SimEngine {
    fn new(endpoint: EngineEndpoint, config: SimConfig) -> Self {
        Self {
            endpoint,
            config,
            players: HashMap::new(),
        }
    }

    async fn run(mut self) {
        loop {
            let next_end = self.players.values().filter_map(SimPlayer::end_at).min();
            let far = Instant::now() + Duration::from_secs(3600);
            select! {
                maybe_req = self.endpoint.rx.recv() => {
                    let Some(req) = maybe_req else {
                        break;
                    };
                    self.handle_request(req).await;
                }
                _ = sleep_until(next_end.unwrap_or(far)), if next_end.is_some() => {
                    self.finish_due(Instant::now()).await;
                }
            }
        }
        tracing::debug!("sim engine stopped");
    }

    async fn emit(&self, raw: String) {
        if let Err(e) = self.endpoint.post(raw).await {
            tracing::warn!(err = %e, "sim engine: controller is gone");
        }
    }

    async fn answer(&self, req: &EngineRequest, result: Result<Option<f64>, EngineError>) {
        if let Err(e) = self.endpoint.reply(req, result).await {
            tracing::warn!(err = %e, "sim engine: controller is gone");
        }
    }

    async fn handle_request(&mut self, req: EngineRequest) {
        let now = Instant::now();
        let id = req.id;
        tracing::trace!(id = %id, action = req.cmd.action().name(), "sim engine request");

        if let EngineCommand::Create { source } = &req.cmd {
            if source.trim().is_empty() {
                self.answer(&req, Err(EngineError::from_code(EngineError::NONE_SUPPORTED)))
                    .await;
            } else {
                self.players
                    .insert(id, SimPlayer::new(self.config.duration_secs));
                self.answer(&req, Ok(None)).await;
            }
            return;
        }

        let Some(player) = self.players.get_mut(&id) else {
            tracing::debug!(id = %id, "sim engine: no such player");
            self.answer(&req, Err(EngineError::from_code(EngineError::ABORTED)))
                .await;
            return;
        };

        let mut posts = Vec::new();
        let result = match &req.cmd {
            EngineCommand::Create { .. } => Ok(None),
            EngineCommand::StartPlaying { .. } => {
                if player.started_at.is_none() {
                    let resume = player.offset > 0.0 && player.offset < player.duration;
                    if !resume {
                        player.offset = 0.0;
                        posts.push(state_message(id, MediaState::Starting));
                    }
                    if !player.announced_duration {
                        player.announced_duration = true;
                        posts.push(status_message(id, MEDIA_DURATION, json!(player.duration)));
                    }
                    player.started_at = Some(now);
                    posts.push(state_message(id, MediaState::Running));
                }
                Ok(None)
            }
            EngineCommand::PausePlaying => {
                if player.started_at.is_some() {
                    player.freeze(now);
                    posts.push(state_message(id, MediaState::Paused));
                }
                Ok(None)
            }
            EngineCommand::StopPlaying => {
                player.offset = 0.0;
                player.started_at = None;
                posts.push(state_message(id, MediaState::Stopped));
                Ok(None)
            }
            EngineCommand::SeekTo { ms } => {
                let target = (*ms as f64 / 1000.0).min(player.duration);
                player.offset = target;
                if player.started_at.is_some() {
                    player.started_at = Some(now);
                }
                posts.push(status_message(id, MEDIA_POSITION, json!(target)));
                Ok(Some(target))
            }
            EngineCommand::GetCurrentPosition => Ok(Some(player.position(now))),
            EngineCommand::SetVolume { gain } => {
                player.volume = *gain;
                tracing::trace!(id = %id, gain, "sim engine volume");
                Ok(None)
            }
            EngineCommand::SetRate { rate } => {
                if rate.is_finite() && *rate > 0.0 {
                    let playing = player.started_at.is_some();
                    player.freeze(now);
                    player.rate = *rate;
                    if playing {
                        player.started_at = Some(now);
                    }
                    Ok(None)
                } else {
                    Err(EngineError::from_code(EngineError::NONE_SUPPORTED))
                }
            }
            EngineCommand::Release => {
                self.players.remove(&id);
                Ok(None)
            }
            EngineCommand::StartRecording { target } => {
                tracing::debug!(id = %id, target = %target, "sim engine recording");
                player.recording = Recording::Active;
                Ok(None)
            }
            EngineCommand::StopRecording => {
                player.recording = Recording::Idle;
                Ok(None)
            }
            EngineCommand::PauseRecording => {
                if player.recording == Recording::Active {
                    player.recording = Recording::Paused;
                }
                Ok(None)
            }
            EngineCommand::ResumeRecording => {
                if player.recording == Recording::Paused {
                    player.recording = Recording::Active;
                }
                Ok(None)
            }
            EngineCommand::GetCurrentAmplitude => match player.recording {
                Recording::Active => Ok(Some(player.volume * 0.5)),
                _ => Ok(Some(0.0)),
            },
        };

        self.answer(&req, result).await;
        for raw in posts {
            self.emit(raw).await;
        }
    }

    async fn finish_due(&mut self, now: Instant) {
        let mut done = Vec::new();
        for (id, player) in self.players.iter_mut() {
            if player.end_at().is_some_and(|t| t <= now) {
                player.offset = player.duration;
                player.started_at = None;
                done.push((*id, player.duration));
            }
        }
        for (id, duration) in done {
            tracing::debug!(id = %id, "sim engine: reached end");
            self.emit(status_message(id, MEDIA_POSITION, json!(duration)))
                .await;
            self.emit(state_message(id, MediaState::Ended)).await;
        }
    }
}

pub fn spawn_sim_engine(config: SimConfig) -> EngineLink {
    let (link, endpoint) = engine_channel(64);
    tokio::spawn(async move {
        SimEngine::new(endpoint, config).run().await;
    });
    link
}

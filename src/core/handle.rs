use tokio::sync::{mpsc, oneshot};

use super::messages::{ControllerCommand, FadeChange, RecordingCommand, TagChange};
use crate::domain::SessionId;
use crate::engine::PlayOptions;
use crate::error::ControllerError;
use crate::media::{SessionCallbacks, SessionEvent, SessionSnapshot};

/// Cloneable front door to the controller task.
///
/// Commands are fire-and-forget: they return once the controller has
/// queued them, and their outcome arrives through the session callbacks.
/// Queries wait for the answer.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerCommand>,
}

impl ControllerHandle {
    pub(crate) fn new(tx: mpsc::Sender<ControllerCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, cmd: ControllerCommand) -> Result<(), ControllerError> {
        self.tx.send(cmd).await?;
        Ok(())
    }

    async fn ask<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ControllerCommand,
    ) -> Result<T, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        Ok(rx.await?)
    }

    /// Registers a new session and asks the engine to prepare `source`.
    pub async fn create(
        &self,
        source: impl Into<String>,
        callbacks: SessionCallbacks,
    ) -> Result<SessionId, ControllerError> {
        let source = source.into();
        self.ask(|reply| ControllerCommand::Create {
            source,
            callbacks,
            reply,
        })
        .await
    }

    /// Snapshot of one session, `None` once released.
    pub async fn get(&self, id: SessionId) -> Result<Option<SessionSnapshot>, ControllerError> {
        self.ask(|reply| ControllerCommand::Get { id, reply }).await
    }

    /// First session, in creation order, tagged with `media_id`.
    pub async fn get_by_media_id(
        &self,
        media_id: impl Into<String>,
    ) -> Result<Option<SessionSnapshot>, ControllerError> {
        let media_id = media_id.into();
        self.ask(|reply| ControllerCommand::GetByMediaId { media_id, reply })
            .await
    }

    /// All sessions, in creation order.
    pub async fn list(&self) -> Result<Vec<SessionSnapshot>, ControllerError> {
        self.ask(|reply| ControllerCommand::List { reply }).await
    }

    /// Sessions currently in `Running`.
    pub async fn running(&self) -> Result<Vec<SessionSnapshot>, ControllerError> {
        self.ask(|reply| ControllerCommand::Running { reply }).await
    }

    /// Routes an event to the session as if it came from the engine.
    pub async fn dispatch(&self, id: SessionId, event: SessionEvent) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Dispatch { id, event }).await
    }

    /// Starts or resumes playback; the state follows the engine's reports.
    pub async fn play(&self, id: SessionId, options: PlayOptions) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Play { id, options }).await
    }

    /// Marks the session paused right away and asks the engine to pause.
    pub async fn pause(&self, id: SessionId) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Pause { id }).await
    }

    /// Cancels any fade-out and stops playback.
    pub async fn stop(&self, id: SessionId) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Stop { id }).await
    }

    /// Seeks to `ms` milliseconds from the start.
    pub async fn seek_to(&self, id: SessionId, ms: u64) -> Result<(), ControllerError> {
        self.send(ControllerCommand::SeekTo { id, ms }).await
    }

    /// Sets the intended volume, clamped to `[0, 1]`.
    pub async fn set_volume(&self, id: SessionId, volume: f64) -> Result<(), ControllerError> {
        self.send(ControllerCommand::SetVolume { id, volume }).await
    }

    /// Ignored with a warning unless the engine supports rate changes.
    pub async fn set_rate(&self, id: SessionId, rate: f64) -> Result<(), ControllerError> {
        self.send(ControllerCommand::SetRate { id, rate }).await
    }

    /// Asks the engine where playback is, in seconds.
    pub async fn get_current_position(&self, id: SessionId) -> Result<f64, ControllerError> {
        self.ask(|reply| ControllerCommand::GetCurrentPosition { id, reply })
            .await?
    }

    pub async fn set_fade_in(&self, id: SessionId, v: bool) -> Result<(), ControllerError> {
        self.fade(id, FadeChange::FadeIn(v)).await
    }

    pub async fn set_fade_out(&self, id: SessionId, v: bool) -> Result<(), ControllerError> {
        self.fade(id, FadeChange::FadeOut(v)).await
    }

    /// Length of the fade windows, in seconds.
    pub async fn set_fade_time(&self, id: SessionId, secs: f64) -> Result<(), ControllerError> {
        self.fade(id, FadeChange::FadeTime(secs)).await
    }

    /// Starts (or cancels) a fade-out from the current position.
    pub async fn set_force_fade_out(&self, id: SessionId, v: bool) -> Result<(), ControllerError> {
        self.fade(id, FadeChange::ForceFadeOut(v)).await
    }

    /// Overrides the fade-out latch.
    pub async fn set_fading_out(&self, id: SessionId, v: bool) -> Result<(), ControllerError> {
        self.fade(id, FadeChange::FadingOut(v)).await
    }

    async fn fade(&self, id: SessionId, change: FadeChange) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Fade { id, change }).await
    }

    pub async fn set_media_id(
        &self,
        id: SessionId,
        media_id: impl Into<String>,
    ) -> Result<(), ControllerError> {
        self.tag(id, TagChange::MediaId(media_id.into())).await
    }

    pub async fn set_instance_number(&self, id: SessionId, n: i64) -> Result<(), ControllerError> {
        self.tag(id, TagChange::InstanceNumber(n)).await
    }

    pub async fn set_playlist_index(
        &self,
        id: SessionId,
        index: Option<usize>,
    ) -> Result<(), ControllerError> {
        self.tag(id, TagChange::PlaylistIndex(index)).await
    }

    async fn tag(&self, id: SessionId, change: TagChange) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Tag { id, change }).await
    }

    /// Starts recording into `target`. Failures reach the error callback.
    pub async fn start_recording(
        &self,
        id: SessionId,
        target: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let cmd = RecordingCommand::Start {
            target: target.into(),
        };
        self.send(ControllerCommand::Recording { id, cmd }).await
    }

    pub async fn stop_recording(&self, id: SessionId) -> Result<(), ControllerError> {
        self.recording(id, RecordingCommand::Stop).await
    }

    pub async fn pause_recording(&self, id: SessionId) -> Result<(), ControllerError> {
        self.recording(id, RecordingCommand::Pause).await
    }

    pub async fn resume_recording(&self, id: SessionId) -> Result<(), ControllerError> {
        self.recording(id, RecordingCommand::Resume).await
    }

    async fn recording(&self, id: SessionId, cmd: RecordingCommand) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Recording { id, cmd }).await
    }

    /// Input level of an active recording; errors go to the caller.
    pub async fn get_current_amplitude(&self, id: SessionId) -> Result<f64, ControllerError> {
        self.ask(|reply| ControllerCommand::GetCurrentAmplitude { id, reply })
            .await?
    }

    /// Removes the session and releases its engine resources. Later
    /// events for `id` are ignored.
    pub async fn release(&self, id: SessionId) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Release { id }).await
    }

    /// Stops the controller task after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(ControllerCommand::Shutdown).await
    }
}

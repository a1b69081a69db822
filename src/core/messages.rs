use tokio::sync::oneshot;

use crate::domain::SessionId;
use crate::engine::PlayOptions;
use crate::error::ControllerError;
use crate::media::{SessionCallbacks, SessionEvent, SessionSnapshot};

pub type ValueReply = oneshot::Sender<Result<f64, ControllerError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum FadeChange {
    FadeIn(bool),
    FadeOut(bool),
    FadeTime(f64),
    ForceFadeOut(bool),
    FadingOut(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagChange {
    MediaId(String),
    InstanceNumber(i64),
    PlaylistIndex(Option<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordingCommand {
    Start { target: String },
    Stop,
    Pause,
    Resume,
}

/// Everything a [`ControllerHandle`](super::ControllerHandle) can ask of the
/// controller task.
#[derive(Debug)]
pub enum ControllerCommand {
    Create {
        source: String,
        callbacks: SessionCallbacks,
        reply: oneshot::Sender<SessionId>,
    },
    /// An already decoded engine event, routed like a channel message.
    Dispatch {
        id: SessionId,
        event: SessionEvent,
    },
    Play {
        id: SessionId,
        options: PlayOptions,
    },
    Pause {
        id: SessionId,
    },
    Stop {
        id: SessionId,
    },
    SeekTo {
        id: SessionId,
        ms: u64,
    },
    SetVolume {
        id: SessionId,
        volume: f64,
    },
    SetRate {
        id: SessionId,
        rate: f64,
    },
    Fade {
        id: SessionId,
        change: FadeChange,
    },
    Tag {
        id: SessionId,
        change: TagChange,
    },
    Recording {
        id: SessionId,
        cmd: RecordingCommand,
    },
    GetCurrentPosition {
        id: SessionId,
        reply: ValueReply,
    },
    GetCurrentAmplitude {
        id: SessionId,
        reply: ValueReply,
    },
    Release {
        id: SessionId,
    },
    Get {
        id: SessionId,
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    GetByMediaId {
        media_id: String,
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    List {
        reply: oneshot::Sender<Vec<SessionSnapshot>>,
    },
    Running {
        reply: oneshot::Sender<Vec<SessionSnapshot>>,
    },
    Shutdown,
}

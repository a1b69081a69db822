//! Controller-level errors

use super::{EngineError, TransportError};
use crate::domain::SessionId;

/// Errors surfaced to callers of the controller handle and to `main`.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The controller task has stopped; no command can be delivered.
    #[error("controller channel closed")]
    ChannelClosed,

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The engine answered a request with an error
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ControllerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ControllerError::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ControllerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        ControllerError::ChannelClosed
    }
}

/// Loading or saving the settings file failed
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

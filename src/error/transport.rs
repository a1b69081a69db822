//! Message channel contract violations
//!
//! Raised when a message arriving on the engine's message channel does not
//! have the agreed shape. These are never swallowed silently: the message is
//! rejected and the error is reported.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Not JSON, or JSON of the wrong shape
    #[error("invalid channel message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel message has no action")]
    MissingAction,

    #[error("unknown media action: {0}")]
    UnknownAction(String),

    /// A status message without one of `id`, `msgType`
    #[error("status message is missing `{0}`")]
    MissingField(&'static str),

    #[error("status message carries an invalid session id {0:?}")]
    BadSessionId(String),
}

//! Errors reported by the native audio engine

/// An error reported by the engine, either as the failed acknowledgement of a
/// command or as an inbound `ERROR` status message.
///
/// `code` is passed through untouched; the constants below are the codes the
/// engine is known to use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine error {code}: {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub const NONE_ACTIVE: i32 = 0;
    pub const ABORTED: i32 = 1;
    pub const NETWORK: i32 = 2;
    pub const DECODE: i32 = 3;
    pub const NONE_SUPPORTED: i32 = 4;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from a bare code, filling in the well-known description.
    pub fn from_code(code: i32) -> Self {
        let message = match code {
            Self::NONE_ACTIVE => "no active media",
            Self::ABORTED => "aborted",
            Self::NETWORK => "network error",
            Self::DECODE => "decode error",
            Self::NONE_SUPPORTED => "source not supported",
            _ => "unknown error",
        };
        Self::new(code, message)
    }
}

use std::fmt;

use super::effects::Notification;
use super::state::MediaState;
use crate::error::EngineError;

pub type SuccessCallback = Box<dyn FnMut() + Send>;
pub type ErrorCallback = Box<dyn FnMut(&EngineError) + Send>;
pub type StatusCallback = Box<dyn FnMut(MediaState) + Send>;
pub type PositionCallback = Box<dyn FnMut(f64) + Send>;

/// Caller-supplied hooks of one session. Every hook is optional; a
/// notification without a registered hook is dropped.
#[derive(Default)]
pub struct SessionCallbacks {
    success: Option<SuccessCallback>,
    error: Option<ErrorCallback>,
    status: Option<StatusCallback>,
    position: Option<PositionCallback>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Playback reached the end of the media.
    pub fn on_success(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&EngineError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_status(mut self, f: impl FnMut(MediaState) + Send + 'static) -> Self {
        self.status = Some(Box::new(f));
        self
    }

    /// Receives the remaining time after every position update.
    pub fn on_position(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.position = Some(Box::new(f));
        self
    }

    pub fn invoke(&mut self, n: &Notification) {
        match n {
            Notification::Success => {
                if let Some(f) = self.success.as_mut() {
                    f();
                }
            }
            Notification::Error(e) => {
                if let Some(f) = self.error.as_mut() {
                    f(e);
                }
            }
            Notification::Status(s) => {
                if let Some(f) = self.status.as_mut() {
                    f(*s);
                }
            }
            Notification::Position { remaining } => {
                if let Some(f) = self.position.as_mut() {
                    f(*remaining);
                }
            }
        }
    }
}

impl fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("status", &self.status.is_some())
            .field("position", &self.position.is_some())
            .finish()
    }
}

//! Session state machine and the position/fade engine behind it.

mod callbacks;
mod effects;
pub mod fade;
mod fade_control;
mod position;
mod session;
mod state;

pub use callbacks::SessionCallbacks;
pub use effects::{Notification, SessionEffect, SessionEffects};
pub use fade::fade_factor;
pub use fade_control::{
    DEFAULT_FADE_OUT_EPSILON_SECS, DEFAULT_FADE_WINDOW_SECS, FadeAction, FadeConfig,
    FadeController, FadeTuning,
};
pub use position::{DEFAULT_POLL_INTERVAL, PositionSnapshot, PositionTracker};
pub use session::{Session, SessionEvent, SessionSnapshot, SessionTags};
pub use state::{MediaState, StatusFlags};

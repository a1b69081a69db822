use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical playback state of a session.
///
/// The discriminants are the ordinals used on the engine's message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MediaState {
    #[default]
    None = 0,
    Starting = 1,
    Running = 2,
    Paused = 3,
    Stopped = 4,
    Ended = 5,
    FadingOut = 6,
}

impl MediaState {
    pub const ALL: [MediaState; 7] = [
        MediaState::None,
        MediaState::Starting,
        MediaState::Running,
        MediaState::Paused,
        MediaState::Stopped,
        MediaState::Ended,
        MediaState::FadingOut,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            MediaState::None => "None",
            MediaState::Starting => "Starting",
            MediaState::Running => "Running",
            MediaState::Paused => "Paused",
            MediaState::Stopped => "Stopped",
            MediaState::Ended => "Ended",
            MediaState::FadingOut => "FadingOut",
        }
    }

    /// Playback is advancing: the position tracker must keep polling.
    ///
    /// `FadingOut` is the tail of `Running`, so the tracker keeps going until
    /// the fade completes and the engine reports `Stopped`.
    pub fn is_tracking(self) -> bool {
        matches!(self, MediaState::Running | MediaState::FadingOut)
    }

    /// Whether `next` is an edge of the documented state graph.
    ///
    /// The engine stays authoritative; this is only used for diagnostics.
    pub fn can_transition_to(self, next: MediaState) -> bool {
        use MediaState::*;
        if self == next {
            return true;
        }
        match self {
            None => matches!(next, Starting),
            Starting => matches!(next, Running | Stopped),
            Running => matches!(next, Paused | FadingOut | Stopped | Ended),
            Paused => matches!(next, Running | Stopped | Ended),
            FadingOut => matches!(next, Stopped | Ended),
            Stopped => matches!(next, Starting | Ended),
            Ended => matches!(next, Starting),
        }
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boolean projections of [`MediaState`] kept for callers that poll flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub loading: bool,
    pub playing: bool,
    pub paused: bool,
    pub stopped: bool,
    pub ended: bool,
}

impl Default for StatusFlags {
    /// A fresh session reports itself as paused until the engine says otherwise.
    fn default() -> Self {
        Self {
            loading: false,
            playing: false,
            paused: true,
            stopped: false,
            ended: false,
        }
    }
}

impl StatusFlags {
    pub fn project(state: MediaState) -> Self {
        Self {
            loading: state == MediaState::Starting,
            playing: state.is_tracking(),
            paused: state == MediaState::Paused,
            stopped: state == MediaState::Stopped,
            ended: state == MediaState::Ended,
        }
    }
}

use super::state::MediaState;
use crate::engine::EngineCommand;
use crate::error::EngineError;

/// A callback the controller must invoke on behalf of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(MediaState),
    Position { remaining: f64 },
    Success,
    Error(EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    Engine(EngineCommand),
    Notify(Notification),
    /// The session entered an actively playing state.
    StartTracking,
}

/// Ordered side effects produced by one session transition.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionEffects {
    pub(crate) actions: Vec<SessionEffect>,
}

impl SessionEffects {
    pub fn send(&mut self, cmd: EngineCommand) {
        self.actions.push(SessionEffect::Engine(cmd));
    }

    pub fn notify(&mut self, n: Notification) {
        self.actions.push(SessionEffect::Notify(n));
    }

    pub fn status(&mut self, s: MediaState) {
        self.notify(Notification::Status(s));
    }

    pub fn start_tracking(&mut self) {
        self.actions.push(SessionEffect::StartTracking);
    }

    pub fn append(&mut self, mut other: SessionEffects) {
        self.actions.append(&mut other.actions);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionEffect> {
        self.actions.iter()
    }

    pub fn engine_commands(&self) -> Vec<&EngineCommand> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                SessionEffect::Engine(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<&Notification> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                SessionEffect::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl IntoIterator for SessionEffects {
    type Item = SessionEffect;
    type IntoIter = std::vec::IntoIter<SessionEffect>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

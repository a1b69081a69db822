use tokio::sync::mpsc;

use super::registry::SessionRegistry;
use crate::domain::SessionId;
use crate::engine::{EngineCommand, EngineRequest};
use crate::media::Notification;

#[derive(Debug, Default)]
pub struct ControllerEffects {
    pub(super) actions: Vec<ControllerEffect>,
}

#[derive(Debug)]
pub enum ControllerEffect {
    SendEngine(EngineRequest),
    Notify {
        id: SessionId,
        notification: Notification,
    },
}

impl ControllerEffects {
    pub fn send_engine(&mut self, req_id: u64, id: SessionId, cmd: EngineCommand) {
        self.actions
            .push(ControllerEffect::SendEngine(EngineRequest { req_id, id, cmd }));
    }

    pub fn notify(&mut self, id: SessionId, notification: Notification) {
        self.actions
            .push(ControllerEffect::Notify { id, notification });
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn requests(&self) -> impl Iterator<Item = &EngineRequest> {
        self.actions.iter().filter_map(|a| match a {
            ControllerEffect::SendEngine(req) => Some(req),
            _ => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = (&SessionId, &Notification)> {
        self.actions.iter().filter_map(|a| match a {
            ControllerEffect::Notify { id, notification } => Some((id, notification)),
            _ => None,
        })
    }
}

pub struct ControllerDispatch<'a> {
    pub(super) tx_engine: &'a mpsc::UnboundedSender<EngineRequest>,
}

/// Performs effects in order without waiting on the engine. Callbacks run
/// here, on the controller task; notifications for sessions released in the
/// meantime are dropped.
pub fn run_effects(
    effects: ControllerEffects,
    dispatch: &ControllerDispatch<'_>,
    registry: &mut SessionRegistry,
) {
    for effect in effects.actions {
        match effect {
            ControllerEffect::SendEngine(req) => {
                let action = req.cmd.action();
                if let Err(e) = dispatch.tx_engine.send(req) {
                    tracing::warn!(err = %e, action = action.name(), "engine channel closed, request dropped");
                }
            }
            ControllerEffect::Notify { id, notification } => match registry.get_mut(&id) {
                Some(entry) => entry.callbacks.invoke(&notification),
                None => tracing::trace!(id = %id, ?notification, "notification for released session dropped"),
            },
        }
    }
}

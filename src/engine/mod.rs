//! Boundary to the native playback engine.
//!
//! The controller talks to the engine over two channels: requests go out
//! tagged with a request id, and everything the engine says comes back as
//! an [`EngineMessage`], either a reply to one request or a raw status
//! message from its message channel.
//!
//! The request channel is unbounded so the controller never waits on the
//! engine; only the engine's side applies backpressure.

mod messages;
pub mod sim;

use tokio::sync::mpsc;

pub use messages::{
    EngineAction, EngineCommand, EngineMessage, EngineRequest, MEDIA_DURATION, MEDIA_ERROR,
    MEDIA_POSITION, MEDIA_STATE, PlayOptions, StatusMessage, error_message,
    parse_channel_message, state_message, status_message,
};

use crate::error::EngineError;

/// Controller side of the engine channels.
#[derive(Debug)]
pub struct EngineLink {
    pub tx: mpsc::UnboundedSender<EngineRequest>,
    pub rx: mpsc::Receiver<EngineMessage>,
}

/// Engine side of the engine channels.
#[derive(Debug)]
pub struct EngineEndpoint {
    pub rx: mpsc::UnboundedReceiver<EngineRequest>,
    pub tx: mpsc::Sender<EngineMessage>,
}

impl EngineEndpoint {
    /// Acknowledges `req`.
    pub async fn reply(
        &self,
        req: &EngineRequest,
        result: Result<Option<f64>, EngineError>,
    ) -> Result<(), mpsc::error::SendError<EngineMessage>> {
        self.tx
            .send(EngineMessage::Reply {
                req_id: req.req_id,
                id: req.id,
                action: req.cmd.action(),
                result,
            })
            .await
    }

    /// Puts a raw payload on the message channel.
    pub async fn post(&self, raw: String) -> Result<(), mpsc::error::SendError<EngineMessage>> {
        self.tx.send(EngineMessage::Channel(raw)).await
    }
}

/// Creates both ends. `buffer` bounds the engine-to-controller direction.
pub fn engine_channel(buffer: usize) -> (EngineLink, EngineEndpoint) {
    let (tx_req, rx_req) = mpsc::unbounded_channel();
    let (tx_msg, rx_msg) = mpsc::channel(buffer);
    (
        EngineLink {
            tx: tx_req,
            rx: rx_msg,
        },
        EngineEndpoint {
            rx: rx_req,
            tx: tx_msg,
        },
    )
}

//! Structured error types for the controller, the engine boundary and settings.

mod controller;
mod engine;
mod transport;

pub use controller::{ControllerError, SettingsError};
pub use engine::EngineError;
pub use transport::TransportError;

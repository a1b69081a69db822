//! The controller task: session registry, tracker schedule and the engine
//! plumbing around them.

mod controller;
mod effects;
mod handle;
mod messages;
mod registry;
mod request_tracker;

pub use controller::spawn_controller;
pub use handle::ControllerHandle;
pub use messages::{ControllerCommand, FadeChange, RecordingCommand, TagChange};
pub use registry::{SessionEntry, SessionRegistry};
pub use request_tracker::RequestTracker;

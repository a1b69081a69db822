pub mod store;

pub use store::{ControllerSettings, load_settings, save_settings, settings_path};

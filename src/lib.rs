//! Multi-session media playback controller.
//!
//! A single controller task owns every playback session, tracks positions by
//! polling the engine, drives equal-power fades and reports back through
//! per-session callbacks. See [`core::spawn_controller`].

pub mod cli;
pub mod core;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod media;
pub mod settings;

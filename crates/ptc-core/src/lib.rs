//! ptc-core — shared types, error taxonomy, configuration, and event bus.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use event::EventBus;
pub use types::*;

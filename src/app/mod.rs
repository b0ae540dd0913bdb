//! Application layer: the settings collaborator injected into the server.

pub mod settings;

pub use settings::{SettingsHandler, SettingsStore};

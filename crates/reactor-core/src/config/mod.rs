//! Configuration: the settings file and engine tunables

mod options;
mod settings;

pub use options::EngineOptions;
pub use settings::{DEFAULT_SETTINGS_PATH, Environment, Integration, ReactorSettings};

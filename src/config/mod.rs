//! Configuration: connection descriptors and the settings file.

mod settings;
mod uri;

pub use settings::{expand_env_vars, ConnectionSettings, LoggingSettings, Settings, SettingsError};
pub use uri::{parse_duration, Uri, UriError};

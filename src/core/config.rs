mod parsing;
mod settings;
mod types;

pub use types::{
    ApiBaseUrl, ApiSettings, AttemptSettings, ConfigError, CredentialSettings, Environment,
    RuntimeSettings, Settings, TelemetrySettings,
};

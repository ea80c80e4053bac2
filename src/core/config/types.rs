use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) attempt: AttemptSettings,
    pub(super) credentials: CredentialSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: ApiBaseUrl,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AttemptSettings {
    pub default_duration_minutes: u64,
    pub tick_millis: u64,
    pub auto_submit_retry_seconds: u64,
    pub auto_submit_retry_max_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Backend base URL without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrl(pub(super) String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api url: {0}")]
    InvalidApiUrl(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl ApiBaseUrl {
    pub(super) fn parse(value: String) -> Result<Self, ConfigError> {
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidApiUrl(value));
        }

        let parsed =
            reqwest::Url::parse(trimmed).map_err(|_| ConfigError::InvalidApiUrl(value.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl(value));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_https(&self) -> bool {
        self.0.starts_with("https://")
    }

    /// Joins `path` onto the base URL; `path` must start with `/`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

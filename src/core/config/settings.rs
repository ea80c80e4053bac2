use super::parsing::{env_optional, parse_bool, parse_environment, parse_positive_u64, parse_u64};
use super::types::{
    ApiBaseUrl, ApiSettings, AttemptSettings, ConfigError, CredentialSettings, RuntimeSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(env_optional)
    }

    /// Builds settings from an arbitrary key lookup. Values are expected to be trimmed and
    /// non-empty, the way [`Settings::load`] reads the process environment.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment =
            parse_environment(lookup("EXAMIFY_ENV").or_else(|| lookup("ENVIRONMENT")));
        let strict_config =
            lookup("EXAMIFY_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = or_default("EXAMIFY_API_URL", "http://localhost:5000/api");
        let request_timeout_seconds = parse_positive_u64(
            "EXAMIFY_REQUEST_TIMEOUT_SECONDS",
            or_default("EXAMIFY_REQUEST_TIMEOUT_SECONDS", "10"),
        )?;

        let default_duration_minutes = parse_positive_u64(
            "EXAMIFY_DEFAULT_DURATION_MINUTES",
            or_default("EXAMIFY_DEFAULT_DURATION_MINUTES", "60"),
        )?;
        let tick_millis =
            parse_positive_u64("EXAMIFY_TICK_MILLIS", or_default("EXAMIFY_TICK_MILLIS", "1000"))?;
        let auto_submit_retry_seconds = parse_u64(
            "EXAMIFY_AUTO_SUBMIT_RETRY_SECONDS",
            or_default("EXAMIFY_AUTO_SUBMIT_RETRY_SECONDS", "1"),
        )?;
        let auto_submit_retry_max_seconds = parse_u64(
            "EXAMIFY_AUTO_SUBMIT_RETRY_MAX_SECONDS",
            or_default("EXAMIFY_AUTO_SUBMIT_RETRY_MAX_SECONDS", "30"),
        )?;

        let email = or_default("EXAMIFY_EMAIL", "");
        let password = or_default("EXAMIFY_PASSWORD", "");

        let log_level = or_default("EXAMIFY_LOG_LEVEL", "info");
        let json = lookup("EXAMIFY_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            lookup("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { base_url: ApiBaseUrl::parse(base_url)?, request_timeout_seconds },
            attempt: AttemptSettings {
                default_duration_minutes,
                tick_millis,
                auto_submit_retry_seconds,
                auto_submit_retry_max_seconds,
            },
            credentials: CredentialSettings { email, password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn credentials(&self) -> &CredentialSettings {
        &self.credentials
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt.auto_submit_retry_max_seconds < self.attempt.auto_submit_retry_seconds {
            return Err(ConfigError::InvalidValue {
                field: "EXAMIFY_AUTO_SUBMIT_RETRY_MAX_SECONDS",
                value: self.attempt.auto_submit_retry_max_seconds.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.api.base_url.is_https() {
            return Err(ConfigError::InvalidApiUrl(self.api.base_url.as_str().to_string()));
        }
        if self.credentials.email.is_empty() || self.credentials.password.is_empty() {
            return Err(ConfigError::MissingSecret("EXAMIFY_EMAIL/EXAMIFY_PASSWORD"));
        }

        Ok(())
    }
}

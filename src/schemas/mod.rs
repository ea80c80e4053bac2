pub mod auth;
pub mod exam;
pub mod results;
pub mod submission;

use serde::Deserialize;

/// Error body returned by the backend for rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).map(|value| value.trim().to_string()).filter(|v| !v.is_empty())
    }
}

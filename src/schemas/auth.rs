use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::context::{Role, SessionContext};

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Both fields are required"))]
    pub old_password: String,
    #[validate(length(min = 1, message = "Both fields are required"))]
    pub new_password: String,
}

/// Acknowledgement body; the backend may or may not include a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
}

impl From<LoginResponse> for SessionContext {
    fn from(response: LoginResponse) -> Self {
        SessionContext::new(response.token, response.role, response.name)
    }
}

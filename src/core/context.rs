use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

/// Identity of the signed-in user. Created by a successful login and dropped on logout;
/// everything that needs the token or the role receives it explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
    role: Role,
    name: String,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, role: Role, name: impl Into<String>) -> Self {
        Self { token: token.into(), role, name: name.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .field("name", &self.name)
            .finish()
    }
}

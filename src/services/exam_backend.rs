use async_trait::async_trait;
use thiserror::Error;

use crate::schemas::exam::StartAttemptResponse;
use crate::schemas::submission::{SubmitAttemptRequest, SubmitAttemptResponse};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request rejected with status {status}: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Text to show the student: the backend's own message when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message: Some(message), .. } | Self::InvalidRequest(message) => {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

/// Remote side of an exam attempt.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// Starts the attempt, or resumes the one already in progress.
    async fn start_attempt(&self, exam_id: &str) -> Result<StartAttemptResponse, BackendError>;

    async fn submit_attempt(
        &self,
        exam_id: &str,
        request: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse, BackendError>;
}

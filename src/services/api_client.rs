use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::config::{ApiBaseUrl, Settings};
use crate::core::context::SessionContext;
use crate::schemas::auth::{ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse};
use crate::schemas::exam::{ExamOverview, StartAttemptResponse};
use crate::schemas::results::ExamResultDto;
use crate::schemas::submission::{SubmitAttemptRequest, SubmitAttemptResponse};
use crate::schemas::ErrorBody;
use crate::services::exam_backend::{BackendError, ExamBackend};

/// HTTP client for the exam backend. Authenticated calls use the bearer token of the
/// current [`SessionContext`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: ApiBaseUrl,
    context: Option<SessionContext>,
}

impl ApiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.api().request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build exam backend HTTP client")?;

        Ok(Self { client, base_url: settings.api().base_url.clone(), context: None })
    }

    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Forgets the signed-in user and hands back the context that was dropped.
    pub fn logout(&mut self) -> Option<SessionContext> {
        let context = self.context.take();
        if let Some(context) = &context {
            tracing::info!(name = %context.name(), "Signed out");
        }
        context
    }

    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SessionContext, BackendError> {
        let request =
            LoginRequest { email: email.trim().to_string(), password: password.to_string() };
        if let Err(err) = request.validate() {
            tracing::debug!(error = %err, "Login request rejected before sending");
            return Err(BackendError::InvalidRequest(
                "Email and password are required".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.base_url.join("/auth/login"))
            .json(&request)
            .send()
            .await?;
        let login: LoginResponse = read_json(response).await?;

        let context = SessionContext::from(login);
        tracing::info!(name = %context.name(), role = ?context.role(), "Signed in");
        self.context = Some(context.clone());
        Ok(context)
    }

    /// Changes the signed-in user's password. Returns the backend's confirmation message, if any.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<Option<String>, BackendError> {
        let request = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        if let Err(err) = request.validate() {
            tracing::debug!(error = %err, "Password change rejected before sending");
            return Err(BackendError::InvalidRequest("Both fields are required".to_string()));
        }

        let url = self.base_url.join("/auth/change-password");
        let request = self.authorized(self.client.post(url).json(&request))?;
        let response: MessageResponse = read_json(request.send().await?).await?;

        tracing::info!("Password changed");
        Ok(response.message)
    }

    pub async fn list_exams(&self) -> Result<Vec<ExamOverview>, BackendError> {
        self.get_json("/student/exams").await
    }

    pub async fn exam_summary(&self, exam_id: &str) -> Result<ExamOverview, BackendError> {
        self.get_json(&format!("/student/exam-summary/{exam_id}")).await
    }

    pub async fn my_results(&self) -> Result<Vec<ExamResultDto>, BackendError> {
        self.get_json("/results/my-results").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let request = self.authorized(self.client.get(self.base_url.join(path)))?;
        read_json(request.send().await?).await
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, BackendError> {
        let context = self.context.as_ref().ok_or(BackendError::Unauthenticated)?;
        Ok(request.header(AUTHORIZATION, context.bearer()))
    }
}

#[async_trait]
impl ExamBackend for ApiClient {
    async fn start_attempt(&self, exam_id: &str) -> Result<StartAttemptResponse, BackendError> {
        self.get_json(&format!("/student/start/{exam_id}")).await
    }

    async fn submit_attempt(
        &self,
        exam_id: &str,
        request: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse, BackendError> {
        let url = self.base_url.join(&format!("/student/submit/{exam_id}"));
        let request = self.authorized(self.client.post(url).json(request))?;
        read_json(request.send().await?).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message =
            serde_json::from_str::<ErrorBody>(&body).ok().and_then(ErrorBody::into_message);
        tracing::debug!(status = status.as_u16(), message = ?message, "Backend rejected request");
        return Err(BackendError::Rejected { status: status.as_u16(), message });
    }

    serde_json::from_str(&body)
        .map_err(|err| BackendError::Decode(format!("{err} (status {status}): {body}")))
}

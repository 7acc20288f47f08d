use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use academy_core::model::{AttemptId, StudentId, SubmittedAnswer, TestId};

use super::gateway::{
    AttemptView, ProgressUpdate, ProgressUpdateRequest, StudentProgress, SubmissionResult,
    SyncGateway,
};
use crate::error::{ScorerError, SyncError};

/// Connection settings for the remote academy API.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub base_url: String,
    pub token: String,
}

impl SyncConfig {
    /// Reads the configuration from `ACADEMY_API_BASE_URL` and
    /// `ACADEMY_API_TOKEN`; returns `None` when either is absent.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("ACADEMY_API_BASE_URL").ok()?;
        let token = env::var("ACADEMY_API_TOKEN").ok()?;
        if base_url.trim().is_empty() || token.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, token })
    }
}

/// Gateway implementation speaking JSON to a remote academy server over
/// the same request/response contract as the store-backed one.
#[derive(Clone)]
pub struct HttpSyncGateway {
    client: Client,
    config: SyncConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    answers: &'a [SubmittedAnswer],
}

impl HttpSyncGateway {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Maps rejection status codes onto the scorer taxonomy so callers see
    /// the same errors whichever gateway they are behind.
    fn rejection(status: StatusCode) -> Option<SyncError> {
        match status {
            StatusCode::CONFLICT => Some(ScorerError::AlreadySubmitted.into()),
            StatusCode::NOT_FOUND => Some(ScorerError::AttemptNotFound.into()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Some(ScorerError::Validation(format!("rejected with status {status}")).into())
            }
            _ => None,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if let Some(err) = Self::rejection(status) {
            return Err(err);
        }
        Err(SyncError::HttpStatus(status))
    }
}

#[async_trait]
impl SyncGateway for HttpSyncGateway {
    async fn update_progress(
        &self,
        _student_id: StudentId,
        request: ProgressUpdateRequest,
    ) -> Result<ProgressUpdate, SyncError> {
        // The caller is identified by the bearer token, not the payload.
        let response = self
            .client
            .post(self.url("videos/progress"))
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn my_progress(
        &self,
        _student_id: StudentId,
    ) -> Result<Vec<StudentProgress>, SyncError> {
        let response = self
            .client
            .get(self.url("videos/progress/my"))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn prepare_attempt(
        &self,
        _student_id: StudentId,
        test_id: TestId,
    ) -> Result<AttemptView, SyncError> {
        let response = self
            .client
            .post(self.url(&format!("tests/{test_id}/attempt")))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn submit_attempt(
        &self,
        _student_id: StudentId,
        attempt_id: AttemptId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmissionResult, SyncError> {
        let response = self
            .client
            .post(self.url(&format!("attempts/{attempt_id}/submit")))
            .bearer_auth(&self.config.token)
            .json(&SubmitBody { answers: &answers })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

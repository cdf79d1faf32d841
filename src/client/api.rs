// src/client/api.rs

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    error::AppError,
    models::session::{
        DownloadResponse, ExamResultResponse, StartExamRequest, StartExamResponse,
        SubmitExamRequest, SubmitExamResponse,
    },
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the student exam protocol.
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl ExamClient {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        ExamClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            auth_token: auth_token.into(),
        }
    }

    /// GET /api/student/exams/{session_id}/download
    pub async fn download(&self, session_id: i64) -> Result<DownloadResponse, AppError> {
        let response = self
            .http
            .get(format!(
                "{}/api/student/exams/{}/download",
                self.base_url, session_id
            ))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    /// POST /api/student/exams/{session_id}/start
    pub async fn start(
        &self,
        session_id: i64,
        session_token: &str,
    ) -> Result<StartExamResponse, AppError> {
        let response = self
            .http
            .post(format!(
                "{}/api/student/exams/{}/start",
                self.base_url, session_id
            ))
            .bearer_auth(&self.auth_token)
            .json(&StartExamRequest {
                session_token: session_token.to_string(),
            })
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    /// POST /api/student/exams/{session_id}/submit, one attempt.
    pub async fn submit(
        &self,
        session_id: i64,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, AppError> {
        let response = self
            .http
            .post(format!(
                "{}/api/student/exams/{}/submit",
                self.base_url, session_id
            ))
            .bearer_auth(&self.auth_token)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    /// Submits, holding the attempt through outages.
    ///
    /// Transport failures and server 5xx responses are retried with a flat
    /// delay up to `max_attempts`. A definitive server answer (any 4xx,
    /// including an already-submitted or closed-window rejection) is
    /// returned immediately; retrying it cannot change the outcome.
    pub async fn submit_with_retry(
        &self,
        session_id: i64,
        request: &SubmitExamRequest,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<SubmitExamResponse, AppError> {
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match self.submit(session_id, request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) => {
                    tracing::warn!(session_id, attempt, "submit attempt failed, will retry");
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            AppError::InternalServerError("Submission retries exhausted".to_string())
        }))
    }

    /// GET /api/student/exams/{session_id}/result
    pub async fn result(&self, session_id: i64) -> Result<ExamResultResponse, AppError> {
        let response = self
            .http
            .get(format!(
                "{}/api/student/exams/{}/result",
                self.base_url, session_id
            ))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::InternalServerError(format!("Request failed: {e}"))
}

/// Only transient failures are worth retrying. A 4xx is the server's
/// final word on this submission.
fn is_retryable(error: &AppError) -> bool {
    matches!(error, AppError::InternalServerError(_))
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport_error);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());

    Err(match status {
        StatusCode::BAD_REQUEST => AppError::BadRequest(message),
        StatusCode::UNAUTHORIZED => AppError::AuthError(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::InternalServerError(message),
    })
}

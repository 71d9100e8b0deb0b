use crate::integration::config::FeedbackConfig;
use crate::{CoachError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the feedback endpoint.
///
/// Sends `POST {question, answer}` and expects `{feedback}` back. Error
/// responses may carry `{error: {message}}`, which is surfaced in the
/// resulting [`CoachError::ServiceError`].
#[derive(Clone)]
pub struct FeedbackClient {
    client: Client,
    endpoint: String,
}

impl FeedbackClient {
    pub fn new(config: &FeedbackConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoachError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service to critique an answer.
    ///
    /// # Errors
    ///
    /// `NetworkError` when the service cannot be reached or times out,
    /// `ServiceError` for non-success statuses and unusable bodies.
    pub async fn get_feedback(&self, question: &str, answer: &str) -> Result<String> {
        debug!("Requesting feedback from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&FeedbackRequest { question, answer })
            .send()
            .await
            .map_err(|e| CoachError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message);
            return Err(CoachError::ServiceError {
                status: status.as_u16(),
                message,
            });
        }

        let body: FeedbackResponse =
            response
                .json()
                .await
                .map_err(|e| CoachError::ServiceError {
                    status: status.as_u16(),
                    message: Some(format!("invalid response body: {}", e)),
                })?;

        body.feedback.ok_or(CoachError::ServiceError {
            status: status.as_u16(),
            message: Some("response did not contain feedback".to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct FeedbackResponse {
    feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

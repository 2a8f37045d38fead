//! HTTP backend for the exam-prep API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use examprep_core::error::{GradingError, ProviderError};
use examprep_core::model::{
    AnswerKey, BackendStatus, ExamBatch, ExamSubmission, GradeReport, PracticeFeedback, Question,
    QuestionId,
};
use examprep_core::traits::{GradingService, QuestionProvider};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Question provider and grading service backed by the REST API.
pub struct HttpBackend {
    base_url: Url,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_token: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url:?}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "base URL cannot have paths appended: {base_url}"
        );
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_token,
            timeout_secs,
            client,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if segments.is_empty() {
            return url;
        }
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, HttpFailure> {
        let response = self.authorize(req).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpFailure::Timeout(self.timeout_secs)
            } else {
                HttpFailure::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpFailure::Status {
                status,
                message: error_detail(body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| HttpFailure::Decode(e.to_string()))
    }
}

/// Transport-level failure, mapped into the caller's error type.
#[derive(Debug)]
enum HttpFailure {
    Status { status: u16, message: String },
    Timeout(u64),
    Network(String),
    Decode(String),
}

impl From<HttpFailure> for ProviderError {
    fn from(f: HttpFailure) -> Self {
        match f {
            HttpFailure::Status { status: 404, message } => ProviderError::NotFound(message),
            HttpFailure::Status { status, message } => ProviderError::ApiError { status, message },
            HttpFailure::Timeout(secs) => ProviderError::Timeout(secs),
            HttpFailure::Network(msg) => ProviderError::NetworkError(msg),
            HttpFailure::Decode(msg) => ProviderError::Decode(msg),
        }
    }
}

impl From<HttpFailure> for GradingError {
    fn from(f: HttpFailure) -> Self {
        match f {
            HttpFailure::Status { status, message } => GradingError::ApiError { status, message },
            HttpFailure::Timeout(secs) => GradingError::Timeout(secs),
            HttpFailure::Network(msg) => GradingError::NetworkError(msg),
            HttpFailure::Decode(msg) => GradingError::Decode(msg),
        }
    }
}

/// Error bodies look like `{"detail": "..."}`; fall back to the raw text.
fn error_detail(body: String) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.detail,
        Err(_) => body,
    }
}

#[async_trait]
impl QuestionProvider for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn subjects(&self) -> Result<Vec<String>, ProviderError> {
        let url = self.endpoint(&["subjects"]);
        Ok(self.fetch(self.client.get(url)).await?)
    }

    #[instrument(skip(self))]
    async fn practice_question(&self, subject: &str) -> Result<Question, ProviderError> {
        let url = self.endpoint(&["practice", subject]);
        Ok(self.fetch(self.client.get(url)).await?)
    }

    #[instrument(skip_all, fields(question = %question, key = %key))]
    async fn submit_practice_answer(
        &self,
        question: &QuestionId,
        key: AnswerKey,
    ) -> Result<PracticeFeedback, ProviderError> {
        let mut url = self.endpoint(&["practice", question.as_str(), "answer"]);
        url.query_pairs_mut()
            .append_pair("selected_key", &key.to_string());
        Ok(self.fetch(self.client.post(url)).await?)
    }

    #[instrument(skip(self))]
    async fn exam_batch(&self) -> Result<ExamBatch, ProviderError> {
        let url = self.endpoint(&["exam", "start"]);
        let batch: ExamBatch = self.fetch(self.client.get(url)).await?;
        tracing::debug!(questions = batch.questions.len(), "exam batch received");
        Ok(batch)
    }

    #[instrument(skip(self))]
    async fn status(&self) -> Result<BackendStatus, ProviderError> {
        let url = self.endpoint(&[]);
        Ok(self.fetch(self.client.get(url)).await?)
    }
}

#[async_trait]
impl GradingService for HttpBackend {
    #[instrument(skip_all, fields(session = %submission.session, answered = submission.answers.len()))]
    async fn grade_exam(&self, submission: &ExamSubmission) -> Result<GradeReport, GradingError> {
        let url = self.endpoint(&["exam", "review"]);
        let req = self.client.post(url).json(&submission.answers);
        Ok(self.fetch(req).await?)
    }
}

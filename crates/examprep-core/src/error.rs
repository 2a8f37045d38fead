//! Collaborator error types.
//!
//! Defined in `examprep-core` so the exam session can record grading
//! failures and the presentation layer can classify provider failures
//! without string matching.

use thiserror::Error;

use crate::model::QuestionId;

/// Errors raised while fetching questions from a question provider.
///
/// A `ProviderError` during `start` leaves the session `NotStarted`; no
/// partial session is ever created.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The exam batch did not contain exactly the configured number of questions.
    #[error("expected {expected} exam questions, provider returned {actual}")]
    WrongBatchSize { expected: usize, actual: usize },

    /// A question failed structural validation.
    #[error("malformed question {id}: {reason}")]
    MalformedQuestion { id: String, reason: String },

    /// The same question appeared twice in one exam batch.
    #[error("question {0} appears more than once in the exam batch")]
    DuplicateQuestion(QuestionId),

    /// The requested subject or question does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The question pool is too small to assemble an exam.
    #[error("not enough questions for an exam: need {needed}, have {available}")]
    NotEnoughQuestions { needed: usize, available: usize },

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::NetworkError(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            // A fresh batch may come back well-formed.
            ProviderError::WrongBatchSize { .. }
            | ProviderError::MalformedQuestion { .. }
            | ProviderError::DuplicateQuestion(_)
            | ProviderError::Decode(_) => true,
            ProviderError::NotFound(_) | ProviderError::NotEnoughQuestions { .. } => false,
        }
    }
}

/// Errors raised by the grading service, or by validation of its reply.
///
/// A `GradingError` leaves the session `Finished` with no result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GradingError {
    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The grade report was decoded but is inconsistent with the exam.
    #[error("malformed grade report: {0}")]
    Malformed(String),
}

/// An exam configuration no exam could run under.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("question_count must be at least 1")]
    NoQuestions,

    #[error("duration_secs must be at least 1")]
    NoTime,
}

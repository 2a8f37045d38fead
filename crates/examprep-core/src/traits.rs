//! Collaborator traits: where questions come from and who grades exams.
//!
//! These async traits are implemented by the `examprep-backends` crate
//! (HTTP and local question bank) and by [`crate::mock::MockBackend`].

use async_trait::async_trait;

use crate::error::{GradingError, ProviderError};
use crate::model::{
    AnswerKey, BackendStatus, ExamBatch, ExamSubmission, GradeReport, PracticeFeedback, Question,
    QuestionId,
};

/// Source of question data for both practice and exam mode.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// List the subject pools questions can be drawn from.
    async fn subjects(&self) -> Result<Vec<String>, ProviderError>;

    /// Fetch one practice question for a subject.
    async fn practice_question(&self, subject: &str) -> Result<Question, ProviderError>;

    /// Submit a practice answer and receive immediate feedback.
    async fn submit_practice_answer(
        &self,
        question: &QuestionId,
        key: AnswerKey,
    ) -> Result<PracticeFeedback, ProviderError>;

    /// Fetch one exam batch. The caller checks the batch size.
    async fn exam_batch(&self) -> Result<ExamBatch, ProviderError>;

    /// Backend health summary.
    async fn status(&self) -> Result<BackendStatus, ProviderError>;
}

/// Grades a finished exam.
///
/// Called at most once per exam session. The pass/fail threshold is the
/// service's own policy.
#[async_trait]
pub trait GradingService: Send + Sync {
    async fn grade_exam(&self, submission: &ExamSubmission) -> Result<GradeReport, GradingError>;
}

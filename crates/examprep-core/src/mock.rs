//! Mock backend for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GradingError, ProviderError};
use crate::model::{
    Answer, AnswerKey, BackendStatus, ExamBatch, ExamSubmission, GradeReport, PracticeFeedback,
    Question, QuestionId, ReviewedAnswer, ReviewedQuestion,
};
use crate::traits::{GradingService, QuestionProvider};

const KEYS: [char; 4] = ['A', 'B', 'C', 'D'];
const CORRECT: char = 'A';

fn is_correct(key: AnswerKey) -> bool {
    key.as_char() == CORRECT
}

/// Generate `n` four-option questions with ids `1..=n`.
///
/// The mock treats `A` as the correct answer of every question.
pub fn sample_questions(n: usize) -> Vec<Question> {
    (1..=n as u64)
        .map(|i| Question {
            id: QuestionId::from(i),
            subject: Some("Sample".to_string()),
            question_text: format!("Sample question {i}"),
            answers: KEYS
                .iter()
                .filter_map(|&c| AnswerKey::new(c))
                .map(|key| Answer {
                    key,
                    text: format!("Option {key}"),
                })
                .collect(),
        })
        .collect()
}

/// An in-memory question provider and grading service with call counters.
///
/// Every question's correct answer is `A`; an exam passes at 75%.
pub struct MockBackend {
    batch_size: usize,
    subjects: Vec<String>,
    grading_error: Option<GradingError>,
    grading_delay: Option<Duration>,
    batch_calls: AtomicU32,
    grade_calls: AtomicU32,
    last_submission: Mutex<Option<ExamSubmission>>,
}

impl MockBackend {
    /// A backend whose exam batches hold `batch_size` questions.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            subjects: vec!["Banking".to_string(), "Insurance".to_string()],
            grading_error: None,
            grading_delay: None,
            batch_calls: AtomicU32::new(0),
            grade_calls: AtomicU32::new(0),
            last_submission: Mutex::new(None),
        }
    }

    /// Make every grading call fail with `error`.
    pub fn with_grading_error(mut self, error: GradingError) -> Self {
        self.grading_error = Some(error);
        self
    }

    /// Hold every grading reply back for `delay`.
    pub fn with_grading_delay(mut self, delay: Duration) -> Self {
        self.grading_delay = Some(delay);
        self
    }

    pub fn batch_calls(&self) -> u32 {
        self.batch_calls.load(Ordering::Relaxed)
    }

    pub fn grade_calls(&self) -> u32 {
        self.grade_calls.load(Ordering::Relaxed)
    }

    /// The most recent grading submission.
    pub fn last_submission(&self) -> Option<ExamSubmission> {
        self.last_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QuestionProvider for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn subjects(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.subjects.clone())
    }

    async fn practice_question(&self, subject: &str) -> Result<Question, ProviderError> {
        if !self.subjects.iter().any(|s| s == subject) {
            return Err(ProviderError::NotFound(format!("subject '{subject}'")));
        }
        let mut question = sample_questions(1).remove(0);
        question.subject = Some(subject.to_string());
        Ok(question)
    }

    async fn submit_practice_answer(
        &self,
        _question: &QuestionId,
        key: AnswerKey,
    ) -> Result<PracticeFeedback, ProviderError> {
        let correct_answer = sample_questions(1)
            .remove(0)
            .answers
            .into_iter()
            .map(|a| a.key)
            .find(|k| is_correct(*k))
            .ok_or_else(|| ProviderError::NotFound("correct answer".to_string()))?;
        Ok(PracticeFeedback {
            correct: Some(is_correct(key)),
            correct_answer,
        })
    }

    async fn exam_batch(&self) -> Result<ExamBatch, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(ExamBatch::new(sample_questions(self.batch_size)))
    }

    async fn status(&self) -> Result<BackendStatus, ProviderError> {
        Ok(BackendStatus {
            message: "mock backend".to_string(),
            questions: self.batch_size,
            subjects: self.subjects.len(),
        })
    }
}

#[async_trait]
impl GradingService for MockBackend {
    async fn grade_exam(&self, submission: &ExamSubmission) -> Result<GradeReport, GradingError> {
        self.grade_calls.fetch_add(1, Ordering::Relaxed);
        *self
            .last_submission
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(submission.clone());

        if let Some(delay) = self.grading_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.grading_error {
            return Err(err.clone());
        }

        let review: Vec<ReviewedQuestion> = submission
            .questions
            .iter()
            .map(|id| {
                let selected = submission.answers.get(id);
                ReviewedQuestion {
                    id: id.clone(),
                    question_text: format!("Sample question {id}"),
                    answers: KEYS
                        .iter()
                        .filter_map(|&c| AnswerKey::new(c))
                        .map(|key| ReviewedAnswer {
                            key,
                            text: format!("Option {key}"),
                            correct: is_correct(key),
                            selected: selected == Some(key),
                        })
                        .collect(),
                    user_correct: Some(selected.is_some_and(is_correct)),
                }
            })
            .collect();

        let score = review.iter().filter(|q| q.is_correct()).count() as u32;
        let total = submission.questions.len() as u32;
        Ok(GradeReport {
            score,
            total,
            passed: score * 4 >= total * 3,
            required: Some((total * 3).div_ceil(4)),
            review,
        })
    }
}

//! Untimed practice: one question at a time with immediate feedback.
//!
//! The only state is the current question and whether it has been
//! answered. An answered question rejects further answers.

use std::sync::Arc;

use tracing::debug;

use crate::error::ProviderError;
use crate::model::{AnswerKey, PracticeFeedback, Question};
use crate::traits::QuestionProvider;

/// Fetch-one / answer-one / fetch-next cycle for a single subject.
pub struct PracticeLoop {
    provider: Arc<dyn QuestionProvider>,
    subject: String,
    current: Option<Question>,
    selected: Option<AnswerKey>,
    feedback: Option<PracticeFeedback>,
    answered: u32,
    correct: u32,
}

impl PracticeLoop {
    pub fn new(provider: Arc<dyn QuestionProvider>, subject: impl Into<String>) -> Self {
        Self {
            provider,
            subject: subject.into(),
            current: None,
            selected: None,
            feedback: None,
            answered: 0,
            correct: 0,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn current(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn selected(&self) -> Option<AnswerKey> {
        self.selected
    }

    pub fn feedback(&self) -> Option<&PracticeFeedback> {
        self.feedback.as_ref()
    }

    /// Running tally as `(correct, answered)`.
    pub fn tally(&self) -> (u32, u32) {
        (self.correct, self.answered)
    }

    /// Replace the current question with a fresh one.
    pub async fn next_question(&mut self) -> Result<&Question, ProviderError> {
        let question = self.provider.practice_question(&self.subject).await?;
        question.validate()?;
        self.selected = None;
        self.feedback = None;
        Ok(&*self.current.insert(question))
    }

    /// Answer the current question.
    ///
    /// Returns `Ok(None)` without contacting the provider when there is no
    /// current question, it is already answered, or it has no such option.
    pub async fn answer(
        &mut self,
        key: AnswerKey,
    ) -> Result<Option<&PracticeFeedback>, ProviderError> {
        let Some(question) = &self.current else {
            return Ok(None);
        };
        if self.selected.is_some() || question.answer(key).is_none() {
            debug!(%key, "practice answer ignored");
            return Ok(None);
        }

        let feedback = self
            .provider
            .submit_practice_answer(&question.id, key)
            .await?;
        self.selected = Some(key);
        self.answered += 1;
        if feedback.is_correct(key) {
            self.correct += 1;
        }
        Ok(Some(&*self.feedback.insert(feedback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn key(s: &str) -> AnswerKey {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn answer_once_per_question() {
        let mut practice = PracticeLoop::new(Arc::new(MockBackend::new(1)), "Banking");
        assert!(practice.answer(key("A")).await.unwrap().is_none());

        practice.next_question().await.unwrap();
        let feedback = practice.answer(key("B")).await.unwrap().unwrap();
        assert_eq!(feedback.correct_answer, key("A"));
        assert!(!feedback.is_correct(key("B")));

        assert!(practice.answer(key("A")).await.unwrap().is_none());
        assert_eq!(practice.selected(), Some(key("B")));
        assert_eq!(practice.tally(), (0, 1));

        practice.next_question().await.unwrap();
        assert!(practice.selected().is_none());
        assert!(practice.feedback().is_none());
        practice.answer(key("A")).await.unwrap();
        assert_eq!(practice.tally(), (1, 2));
    }

    #[tokio::test]
    async fn unknown_subject_propagates() {
        let mut practice = PracticeLoop::new(Arc::new(MockBackend::new(1)), "Astrology");
        let err = practice.next_question().await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(practice.current().is_none());
    }
}

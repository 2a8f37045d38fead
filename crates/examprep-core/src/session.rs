//! The exam session state machine.
//!
//! A session moves `NotStarted -> InProgress -> Finished`. `Finished` is
//! terminal; `abort` is the only way back to `NotStarted`, and it discards
//! everything. The session itself never performs I/O except inside
//! [`ExamSession::start`]; finishing hands back an [`ExamSubmission`] that
//! the caller must send to the grading service, and the reply comes back
//! through [`ExamSession::deliver_grade`].
//!
//! Answer policy: the first committed selection for a position stands.
//! Later selections for the same position are ignored, as are keys the
//! current question does not offer.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ExamConfig;
use crate::error::{GradingError, ProviderError};
use crate::model::{
    AnswerKey, AnswerSheet, ExamBatch, ExamResult, ExamSubmission, GradeReport, Question,
    ReviewedQuestion, SessionId,
};
use crate::traits::QuestionProvider;

/// Coarse lifecycle stage of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    NotStarted,
    InProgress,
    Finished,
}

impl Phase {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Where a finished exam stands with respect to grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingState {
    /// The exam has not finished, so nothing was submitted.
    NotSubmitted,
    /// Submitted, reply not yet applied.
    Awaiting,
    /// A valid result is available.
    Graded,
    /// Grading failed; the result will not arrive.
    Unavailable,
}

/// Outcome of [`ExamSession::advance`].
#[derive(Debug)]
pub enum Advance {
    /// Moved to the question at this index.
    Moved(usize),
    /// The last question was passed; submit this for grading.
    Finished(ExamSubmission),
    /// The session is not in progress.
    Ignored,
}

/// Outcome of [`ExamSession::tick`].
#[derive(Debug)]
pub enum Tick {
    /// Seconds left after this tick.
    Counting(u32),
    /// Time ran out; submit this for grading.
    Expired(ExamSubmission),
    /// The session is not in progress.
    Ignored,
}

/// Outcome of [`ExamSession::deliver_grade`].
#[derive(Debug, PartialEq, Eq)]
pub enum GradeDelivery {
    /// The report was valid and is now the session result.
    Accepted,
    /// Grading failed or the report was inconsistent; no result.
    Failed(GradingError),
    /// The reply belongs to another session, or this one already settled.
    Stale,
}

/// One timed run through a fixed question batch.
#[derive(Debug)]
pub struct ExamSession {
    id: SessionId,
    config: ExamConfig,
    phase: Phase,
    questions: Vec<Question>,
    index: usize,
    answers: AnswerSheet,
    time_remaining: u32,
    result: Option<ExamResult>,
    grading_error: Option<GradingError>,
    started_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    pub fn new(config: ExamConfig) -> Self {
        Self {
            id: SessionId::new(),
            config,
            phase: Phase::NotStarted,
            questions: Vec::new(),
            index: 0,
            answers: AnswerSheet::new(),
            time_remaining: config.duration_secs,
            result: None,
            grading_error: None,
            started_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Discard all state and fetch a fresh batch from the provider.
    ///
    /// On error the session stays `NotStarted`.
    pub async fn start(&mut self, provider: &dyn QuestionProvider) -> Result<(), ProviderError> {
        self.reset();
        let batch = provider.exam_batch().await?;
        self.begin(batch)
    }

    /// Install a fetched batch and move to `InProgress`.
    ///
    /// The batch must hold exactly `question_count` well-formed questions
    /// with distinct ids. A rejected batch leaves the session untouched.
    pub fn begin(&mut self, batch: ExamBatch) -> Result<(), ProviderError> {
        validate_batch(&batch, self.config.question_count)?;

        self.reset();
        self.questions = batch.questions;
        self.phase = Phase::InProgress;
        self.started_at = Some(Utc::now());
        info!(
            session = %self.id,
            questions = self.questions.len(),
            duration_secs = self.time_remaining,
            "exam started"
        );
        Ok(())
    }

    /// Commit `key` for the current position.
    ///
    /// Returns `false` (and changes nothing) when the session is not in
    /// progress, the position is already answered, or the question has no
    /// option with that key.
    pub fn select_answer(&mut self, key: AnswerKey) -> bool {
        let Some(question) = self.current_question() else {
            debug!(%key, "selection ignored, no exam in progress");
            return false;
        };
        if question.answer(key).is_none() {
            debug!(%key, question = %question.id, "selection ignored, unknown key");
            return false;
        }
        let id = question.id.clone();
        let recorded = self.answers.record(id.clone(), key);
        if recorded {
            debug!(%key, question = %id, index = self.index, "answer recorded");
        } else {
            debug!(%key, question = %id, "selection ignored, position already answered");
        }
        recorded
    }

    /// Move to the next question, or finish after the last one.
    pub fn advance(&mut self) -> Advance {
        if self.phase != Phase::InProgress {
            return Advance::Ignored;
        }
        if self.index + 1 < self.questions.len() {
            self.index += 1;
            return Advance::Moved(self.index);
        }
        match self.finish() {
            Some(submission) => Advance::Finished(submission),
            None => Advance::Ignored,
        }
    }

    /// One elapsed second. Reaching zero finishes the exam with whatever
    /// answers were committed.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::InProgress {
            return Tick::Ignored;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return Tick::Counting(self.time_remaining);
        }
        info!(session = %self.id, answered = self.answers.len(), "exam time expired");
        match self.finish() {
            Some(submission) => Tick::Expired(submission),
            None => Tick::Ignored,
        }
    }

    /// Close the exam and produce its grading submission.
    ///
    /// Returns `Some` exactly once per session: only an `InProgress` session
    /// can finish. The phase flips before any reply exists, so
    /// `Finished` with no result means "awaiting grade".
    pub fn finish(&mut self) -> Option<ExamSubmission> {
        if self.phase != Phase::InProgress {
            return None;
        }
        self.phase = Phase::Finished;
        info!(
            session = %self.id,
            answered = self.answers.len(),
            total = self.questions.len(),
            "exam finished, submitting for grading"
        );
        Some(ExamSubmission {
            session: self.id,
            answers: self.answers.clone(),
            questions: self.questions.iter().map(|q| q.id.clone()).collect(),
        })
    }

    /// Return to `NotStarted` from any phase, discarding all answers.
    ///
    /// The session id changes, so in-flight replies for the old run are
    /// stale on arrival.
    pub fn abort(&mut self) {
        if self.phase != Phase::NotStarted {
            info!(session = %self.id, phase = ?self.phase, "exam aborted");
        }
        self.reset();
    }

    /// Apply a grading reply.
    pub fn deliver_grade(
        &mut self,
        session: SessionId,
        outcome: Result<GradeReport, GradingError>,
    ) -> GradeDelivery {
        if session != self.id || self.phase != Phase::Finished {
            debug!(reply = %session, current = %self.id, "discarding stale grading reply");
            return GradeDelivery::Stale;
        }
        if self.result.is_some() || self.grading_error.is_some() {
            warn!(session = %self.id, "discarding duplicate grading reply");
            return GradeDelivery::Stale;
        }

        match outcome.and_then(|report| self.review_from(report)) {
            Ok(result) => {
                info!(
                    session = %self.id,
                    score = result.score,
                    total = result.total,
                    passed = result.passed,
                    "exam graded"
                );
                self.result = Some(result);
                GradeDelivery::Accepted
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "grading failed, result unavailable");
                self.grading_error = Some(e.clone());
                GradeDelivery::Failed(e)
            }
        }
    }

    fn reset(&mut self) {
        self.id = SessionId::new();
        self.phase = Phase::NotStarted;
        self.questions.clear();
        self.index = 0;
        self.answers = AnswerSheet::new();
        self.time_remaining = self.config.duration_secs;
        self.result = None;
        self.grading_error = None;
        self.started_at = None;
    }

    /// Check a report against this exam and put its review in exam order.
    fn review_from(&self, report: GradeReport) -> Result<ExamResult, GradingError> {
        let expected = self.questions.len();
        if report.total as usize != expected {
            return Err(GradingError::Malformed(format!(
                "total {} does not match exam length {expected}",
                report.total
            )));
        }
        if report.score > report.total {
            return Err(GradingError::Malformed(format!(
                "score {} exceeds total {}",
                report.score, report.total
            )));
        }

        let position: HashMap<_, _> = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| (&q.id, i))
            .collect();

        let mut seen = HashSet::new();
        let mut ordered: Vec<(usize, ReviewedQuestion)> = Vec::with_capacity(report.review.len());
        for reviewed in report.review {
            let Some(&at) = position.get(&reviewed.id) else {
                return Err(GradingError::Malformed(format!(
                    "review mentions question {} which is not in this exam",
                    reviewed.id
                )));
            };
            if !seen.insert(at) {
                return Err(GradingError::Malformed(format!(
                    "question {} reviewed twice",
                    reviewed.id
                )));
            }
            let correct = reviewed.answers.iter().filter(|a| a.correct).count();
            if correct != 1 {
                return Err(GradingError::Malformed(format!(
                    "question {} has {correct} correct answers",
                    reviewed.id
                )));
            }
            let mut selected = reviewed.answers.iter().filter(|a| a.selected).map(|a| a.key);
            let marked = selected.next();
            if selected.next().is_some() {
                return Err(GradingError::Malformed(format!(
                    "question {} has more than one selected answer",
                    reviewed.id
                )));
            }
            let submitted = self.answers.get(&reviewed.id);
            if marked != submitted {
                return Err(GradingError::Malformed(format!(
                    "question {} marks {} as selected, submitted answer was {}",
                    reviewed.id,
                    marked.map_or_else(|| "nothing".to_string(), |k| k.to_string()),
                    submitted.map_or_else(|| "nothing".to_string(), |k| k.to_string()),
                )));
            }
            ordered.push((at, reviewed));
        }
        ordered.sort_by_key(|(at, _)| *at);

        Ok(ExamResult {
            score: report.score,
            total: report.total,
            passed: report.passed,
            required: report.required,
            review: ordered.into_iter().map(|(_, q)| q).collect(),
            graded_at: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// The question at the cursor, while the exam is in progress.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::InProgress => self.questions.get(self.index),
            _ => None,
        }
    }

    /// Whether the current position already has a committed answer.
    pub fn is_current_answered(&self) -> bool {
        self.current_question()
            .is_some_and(|q| self.answers.contains(&q.id))
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Configured exam length (N).
    pub fn question_count(&self) -> usize {
        self.config.question_count
    }

    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    pub fn grading_error(&self) -> Option<&GradingError> {
        self.grading_error.as_ref()
    }

    pub fn grading_state(&self) -> GradingState {
        match (self.phase, &self.result, &self.grading_error) {
            (Phase::Finished, Some(_), _) => GradingState::Graded,
            (Phase::Finished, None, Some(_)) => GradingState::Unavailable,
            (Phase::Finished, None, None) => GradingState::Awaiting,
            _ => GradingState::NotSubmitted,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
}

fn validate_batch(batch: &ExamBatch, expected: usize) -> Result<(), ProviderError> {
    if batch.questions.len() != expected {
        return Err(ProviderError::WrongBatchSize {
            expected,
            actual: batch.questions.len(),
        });
    }
    let mut ids = HashSet::with_capacity(expected);
    for question in &batch.questions {
        question.validate()?;
        if !ids.insert(&question.id) {
            return Err(ProviderError::DuplicateQuestion(question.id.clone()));
        }
    }
    Ok(())
}

/// Render seconds as `m:ss`.
pub fn format_remaining(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{sample_questions, MockBackend};
    use crate::model::{QuestionId, ReviewedAnswer};

    fn key(s: &str) -> AnswerKey {
        s.parse().unwrap()
    }

    fn started(n: usize, duration: u32) -> ExamSession {
        let mut session = ExamSession::new(ExamConfig::new(n, duration));
        session
            .begin(ExamBatch::new(sample_questions(n)))
            .unwrap();
        session
    }

    fn report_for(submission: &ExamSubmission) -> GradeReport {
        let review: Vec<ReviewedQuestion> = submission
            .questions
            .iter()
            .map(|id| {
                let selected = submission.answers.get(id);
                ReviewedQuestion {
                    id: id.clone(),
                    question_text: format!("Question {id}"),
                    answers: ["A", "B", "C", "D"]
                        .iter()
                        .map(|k| ReviewedAnswer {
                            key: key(k),
                            text: k.to_string(),
                            correct: *k == "A",
                            selected: selected == Some(key(k)),
                        })
                        .collect(),
                    user_correct: None,
                }
            })
            .collect();
        let score = review.iter().filter(|q| q.is_correct()).count() as u32;
        GradeReport {
            score,
            total: submission.questions.len() as u32,
            passed: score * 4 >= submission.questions.len() as u32 * 3,
            required: None,
            review,
        }
    }

    #[test]
    fn new_session_is_not_started() {
        let session = ExamSession::new(ExamConfig::new(3, 5));
        assert_eq!(session.phase(), Phase::NotStarted);
        assert_eq!(session.index(), 0);
        assert_eq!(session.time_remaining(), 5);
        assert!(session.current_question().is_none());
        assert_eq!(session.grading_state(), GradingState::NotSubmitted);
    }

    #[test]
    fn begin_rejects_wrong_batch_size() {
        let mut session = ExamSession::new(ExamConfig::new(3, 5));
        let err = session
            .begin(ExamBatch::new(sample_questions(2)))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::WrongBatchSize {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(session.phase(), Phase::NotStarted);
    }

    #[test]
    fn begin_rejects_duplicate_and_malformed_questions() {
        let mut session = ExamSession::new(ExamConfig::new(2, 5));
        let mut questions = sample_questions(2);
        questions[1].id = questions[0].id.clone();
        assert!(matches!(
            session.begin(ExamBatch::new(questions)),
            Err(ProviderError::DuplicateQuestion(_))
        ));

        let mut questions = sample_questions(2);
        questions[0].answers.clear();
        assert!(matches!(
            session.begin(ExamBatch::new(questions)),
            Err(ProviderError::MalformedQuestion { .. })
        ));
        assert_eq!(session.phase(), Phase::NotStarted);
    }

    #[tokio::test]
    async fn start_fetches_batch() {
        let backend = MockBackend::new(3);
        let mut session = ExamSession::new(ExamConfig::new(3, 5));
        session.start(&backend).await.unwrap();
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.questions().len(), 3);
        assert_eq!(backend.batch_calls(), 1);
        assert!(session.started_at().is_some());
    }

    #[tokio::test]
    async fn start_failure_leaves_session_not_started() {
        let backend = MockBackend::new(2);
        let mut session = ExamSession::new(ExamConfig::new(3, 5));
        let err = session.start(&backend).await.unwrap_err();
        assert!(matches!(err, ProviderError::WrongBatchSize { .. }));
        assert_eq!(session.phase(), Phase::NotStarted);
        assert!(session.questions().is_empty());
    }

    #[test]
    fn first_selection_stands() {
        let mut session = started(3, 60);
        assert!(session.select_answer(key("B")));
        assert!(!session.select_answer(key("C")));
        assert!(session.is_current_answered());
        let id = session.current_question().unwrap().id.clone();
        assert_eq!(session.answers().get(&id), Some(key("B")));
    }

    #[test]
    fn unknown_key_is_ignored() {
        let mut session = started(3, 60);
        assert!(!session.select_answer(key("Z")));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn selection_before_start_is_ignored() {
        let mut session = ExamSession::new(ExamConfig::new(3, 60));
        assert!(!session.select_answer(key("A")));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn advance_n_minus_one_times_stays_in_progress() {
        let mut session = started(4, 60);
        for expected in 1..4 {
            assert!(matches!(session.advance(), Advance::Moved(i) if i == expected));
        }
        assert_eq!(session.index(), 3);
        assert_eq!(session.phase(), Phase::InProgress);
        assert!(!session.is_current_answered());

        let Advance::Finished(submission) = session.advance() else {
            panic!("last advance should finish");
        };
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.index(), 3);
        assert!(submission.answers.is_empty());
        assert_eq!(submission.questions.len(), 4);
        assert!(matches!(session.advance(), Advance::Ignored));
    }

    #[test]
    fn ticks_expire_exactly_once() {
        let mut session = started(3, 5);
        for left in (1..5).rev() {
            assert!(matches!(session.tick(), Tick::Counting(t) if t == left));
        }
        assert!(matches!(session.tick(), Tick::Expired(_)));
        assert_eq!(session.time_remaining(), 0);
        assert_eq!(session.phase(), Phase::Finished);
        assert!(matches!(session.tick(), Tick::Ignored));
        assert!(session.finish().is_none());
    }

    #[test]
    fn finish_is_idempotent() {
        let mut session = started(3, 5);
        assert!(session.finish().is_some());
        assert!(session.finish().is_none());
        assert_eq!(session.grading_state(), GradingState::Awaiting);
        assert!(session.result().is_none());
    }

    #[test]
    fn finish_before_start_is_noop() {
        let mut session = ExamSession::new(ExamConfig::new(3, 5));
        assert!(session.finish().is_none());
        assert_eq!(session.phase(), Phase::NotStarted);
    }

    #[test]
    fn scripted_exam_expires_with_partial_answers() {
        let mut session = started(3, 5);
        let ids: Vec<QuestionId> = session.questions().iter().map(|q| q.id.clone()).collect();

        assert!(session.select_answer(key("B")));
        assert!(matches!(session.advance(), Advance::Moved(1)));
        assert!(session.select_answer(key("A")));
        assert!(matches!(session.advance(), Advance::Moved(2)));

        let mut submissions = Vec::new();
        for _ in 0..5 {
            if let Tick::Expired(s) = session.tick() {
                submissions.push(s);
            }
        }
        assert_eq!(submissions.len(), 1);
        assert_eq!(session.phase(), Phase::Finished);

        let answers = &submissions[0].answers;
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get(&ids[0]), Some(key("B")));
        assert_eq!(answers.get(&ids[1]), Some(key("A")));
        assert!(!answers.contains(&ids[2]));
    }

    #[test]
    fn abort_resets_everything() {
        let mut session = started(3, 5);
        let first_id = session.id();
        session.select_answer(key("A"));
        session.advance();
        session.tick();
        session.abort();

        assert_eq!(session.phase(), Phase::NotStarted);
        assert_eq!(session.index(), 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.time_remaining(), 5);
        assert!(session.result().is_none());
        assert_ne!(session.id(), first_id);

        // Also from NotStarted and Finished.
        session.abort();
        assert_eq!(session.phase(), Phase::NotStarted);
        let mut session = started(3, 5);
        session.finish();
        session.abort();
        assert_eq!(session.phase(), Phase::NotStarted);
        assert_eq!(session.grading_state(), GradingState::NotSubmitted);
    }

    #[test]
    fn grade_is_accepted_and_ordered() {
        let mut session = started(3, 60);
        session.select_answer(key("A"));
        session.advance();
        session.select_answer(key("C"));
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.review.reverse();
        assert_eq!(
            session.deliver_grade(submission.session, Ok(report)),
            GradeDelivery::Accepted
        );

        let result = session.result().unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 3);
        let order: Vec<_> = result.review.iter().map(|q| q.id.clone()).collect();
        assert_eq!(order, submission.questions);
        assert!(result.review[2].selected_answer().is_none());
        assert_eq!(session.grading_state(), GradingState::Graded);
    }

    #[test]
    fn result_is_written_once() {
        let mut session = started(2, 60);
        let submission = session.finish().unwrap();
        let report = report_for(&submission);
        assert_eq!(
            session.deliver_grade(submission.session, Ok(report.clone())),
            GradeDelivery::Accepted
        );
        let mut second = report;
        second.score = 2;
        assert_eq!(
            session.deliver_grade(submission.session, Ok(second)),
            GradeDelivery::Stale
        );
        assert_eq!(session.result().unwrap().score, 0);
    }

    #[test]
    fn stale_grade_after_abort_is_discarded() {
        let mut session = started(3, 60);
        let submission = session.finish().unwrap();
        session.abort();

        let report = report_for(&submission);
        assert_eq!(
            session.deliver_grade(submission.session, Ok(report)),
            GradeDelivery::Stale
        );
        assert!(session.result().is_none());
        assert_eq!(session.phase(), Phase::NotStarted);
    }

    #[test]
    fn grading_error_marks_result_unavailable() {
        let mut session = started(2, 60);
        let submission = session.finish().unwrap();
        let delivery = session.deliver_grade(
            submission.session,
            Err(GradingError::NetworkError("connection reset".into())),
        );
        assert!(matches!(delivery, GradeDelivery::Failed(_)));
        assert_eq!(session.grading_state(), GradingState::Unavailable);
        assert!(session.result().is_none());
        assert_eq!(session.phase(), Phase::Finished);
    }

    #[test]
    fn inconsistent_report_is_rejected() {
        let mut session = started(2, 60);
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.total = 60;
        let delivery = session.deliver_grade(submission.session, Ok(report));
        assert!(matches!(
            delivery,
            GradeDelivery::Failed(GradingError::Malformed(_))
        ));
        assert!(session.result().is_none());
    }

    #[test]
    fn report_with_two_correct_answers_is_rejected() {
        let mut session = started(2, 60);
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.review[0].answers[1].correct = true;
        let delivery = session.deliver_grade(submission.session, Ok(report));
        assert!(matches!(
            delivery,
            GradeDelivery::Failed(GradingError::Malformed(m)) if m.contains("2 correct answers")
        ));
    }

    #[test]
    fn report_selection_must_match_submitted_answers() {
        let mut session = started(2, 60);
        session.select_answer(key("B"));
        session.advance();
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.review[1].answers[2].selected = true;
        assert!(matches!(
            session.deliver_grade(submission.session, Ok(report)),
            GradeDelivery::Failed(GradingError::Malformed(m)) if m.contains("marks C as selected, submitted answer was nothing")
        ));
        assert!(session.result().is_none());
        assert_eq!(session.grading_state(), GradingState::Unavailable);
    }

    #[test]
    fn report_with_changed_selection_is_rejected() {
        let mut session = started(1, 60);
        session.select_answer(key("B"));
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.review[0].answers[1].selected = false;
        report.review[0].answers[0].selected = true;
        assert!(matches!(
            session.deliver_grade(submission.session, Ok(report)),
            GradeDelivery::Failed(GradingError::Malformed(m)) if m.contains("marks A as selected, submitted answer was B")
        ));
    }

    #[test]
    fn report_for_foreign_question_is_rejected() {
        let mut session = started(2, 60);
        let submission = session.finish().unwrap();

        let mut report = report_for(&submission);
        report.review[0].id = QuestionId::from("not-in-exam");
        assert!(matches!(
            session.deliver_grade(submission.session, Ok(report)),
            GradeDelivery::Failed(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn answers_only_reference_exam_questions() {
        let mut session = started(5, 60);
        for k in ["A", "B", "C", "D", "A"] {
            session.select_answer(key(k));
            session.select_answer(key("B"));
            session.advance();
        }
        assert_eq!(session.answered_count(), 5);
        assert!(session.answered_count() <= session.question_count());
        for (id, _) in session.answers().iter() {
            assert!(session.questions().iter().any(|q| &q.id == id));
        }
    }

    #[test]
    fn format_remaining_pads_seconds() {
        assert_eq!(format_remaining(3600), "60:00");
        assert_eq!(format_remaining(65), "1:05");
        assert_eq!(format_remaining(0), "0:00");
    }
}

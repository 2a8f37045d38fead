//! Event loop around an [`ExamSession`].
//!
//! The controller owns the session, the one periodic timer task, and the
//! channel through which timer ticks and grading replies come back. Every
//! event is applied to the session one at a time in [`ExamController::next_update`],
//! so the session is never mutated concurrently. Events are tagged with the
//! session id that produced them; anything from an aborted or replaced
//! session is reported as [`ExamUpdate::Stale`] and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, trace, warn};

use crate::config::ExamConfig;
use crate::error::{GradingError, ProviderError};
use crate::model::{AnswerKey, ExamSubmission, GradeReport, SessionId};
use crate::session::{Advance, ExamSession, GradeDelivery, Phase, Tick};
use crate::traits::{GradingService, QuestionProvider};

/// Countdown resolution.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Something that happened outside user input.
#[derive(Debug)]
enum SessionEvent {
    Tick(SessionId),
    Graded {
        session: SessionId,
        outcome: Result<GradeReport, GradingError>,
    },
}

/// What applying one event did to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum ExamUpdate {
    /// One second elapsed.
    Ticked { remaining: u32 },
    /// Time ran out; the exam finished and was submitted.
    Expired,
    /// The grading reply arrived and the result is available.
    Graded,
    /// Grading failed; the result is unavailable.
    GradingFailed(GradingError),
    /// The event belonged to a session that no longer exists.
    Stale,
}

/// Drives one exam at a time against a provider and a grading service.
pub struct ExamController {
    provider: Arc<dyn QuestionProvider>,
    grading: Arc<dyn GradingService>,
    session: ExamSession,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    timer: Option<JoinHandle<()>>,
}

impl ExamController {
    pub fn new(
        provider: Arc<dyn QuestionProvider>,
        grading: Arc<dyn GradingService>,
        config: ExamConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            grading,
            session: ExamSession::new(config),
            events_tx,
            events_rx,
            timer: None,
        }
    }

    /// Read access for the presentation layer.
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Replace whatever ran before with a fresh exam and start its countdown.
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        self.stop_timer();
        self.session.start(self.provider.as_ref()).await?;
        self.spawn_timer();
        Ok(())
    }

    pub fn select_answer(&mut self, key: AnswerKey) -> bool {
        self.session.select_answer(key)
    }

    /// Move on. Returns the phase afterwards; `Finished` means this call
    /// submitted the exam.
    pub fn advance(&mut self) -> Phase {
        if let Advance::Finished(submission) = self.session.advance() {
            self.dispatch(submission);
        }
        self.session.phase()
    }

    /// Submit early. Returns `false` if there was nothing to finish.
    pub fn finish(&mut self) -> bool {
        match self.session.finish() {
            Some(submission) => {
                self.dispatch(submission);
                true
            }
            None => false,
        }
    }

    /// Drop the exam without grading it. Pending replies become stale.
    pub fn abort(&mut self) {
        self.stop_timer();
        self.session.abort();
    }

    /// Wait for the next tick or grading reply and apply it.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no event.
    /// Returns `None` only if the event channel closed, which cannot happen
    /// while the controller is alive.
    pub async fn next_update(&mut self) -> Option<ExamUpdate> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    fn apply(&mut self, event: SessionEvent) -> ExamUpdate {
        match event {
            SessionEvent::Tick(id) if id != self.session.id() => {
                trace!(tick = %id, "dropping tick from a previous session");
                ExamUpdate::Stale
            }
            SessionEvent::Tick(_) => match self.session.tick() {
                Tick::Counting(remaining) => {
                    trace!(remaining, "tick");
                    ExamUpdate::Ticked { remaining }
                }
                Tick::Expired(submission) => {
                    self.dispatch(submission);
                    ExamUpdate::Expired
                }
                Tick::Ignored => ExamUpdate::Stale,
            },
            SessionEvent::Graded { session, outcome } => {
                match self.session.deliver_grade(session, outcome) {
                    GradeDelivery::Accepted => ExamUpdate::Graded,
                    GradeDelivery::Failed(e) => ExamUpdate::GradingFailed(e),
                    GradeDelivery::Stale => ExamUpdate::Stale,
                }
            }
        }
    }

    fn spawn_timer(&mut self) {
        let tx = self.events_tx.clone();
        let id = self.session.id();
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                ticker.tick().await;
                if tx.send(SessionEvent::Tick(id)).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Send the one grading request of this session. The reply comes back
    /// through the event channel.
    fn dispatch(&mut self, submission: ExamSubmission) {
        self.stop_timer();
        let tx = self.events_tx.clone();
        let grading = Arc::clone(&self.grading);
        debug!(
            session = %submission.session,
            answered = submission.answers.len(),
            "dispatching grading request"
        );
        tokio::spawn(async move {
            let outcome = grading.grade_exam(&submission).await;
            if tx
                .send(SessionEvent::Graded {
                    session: submission.session,
                    outcome,
                })
                .is_err()
            {
                warn!(session = %submission.session, "grading reply arrived after exam mode closed");
            }
        });
    }
}

impl Drop for ExamController {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::session::GradingState;

    fn key(s: &str) -> AnswerKey {
        s.parse().unwrap()
    }

    fn controller(backend: &Arc<MockBackend>, n: usize, secs: u32) -> ExamController {
        ExamController::new(
            Arc::clone(backend) as Arc<dyn QuestionProvider>,
            Arc::clone(backend) as Arc<dyn GradingService>,
            ExamConfig::new(n, secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expires_and_grades_once() {
        let backend = Arc::new(MockBackend::new(3));
        let mut ctl = controller(&backend, 3, 5);
        ctl.start().await.unwrap();
        let ids: Vec<_> = ctl.session().questions().iter().map(|q| q.id.clone()).collect();

        assert!(ctl.select_answer(key("B")));
        assert_eq!(ctl.advance(), Phase::InProgress);
        assert_eq!(ctl.session().index(), 1);
        assert!(ctl.select_answer(key("A")));
        assert_eq!(ctl.advance(), Phase::InProgress);
        assert_eq!(ctl.session().index(), 2);

        for remaining in (1..5).rev() {
            assert_eq!(
                ctl.next_update().await,
                Some(ExamUpdate::Ticked { remaining })
            );
        }
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Expired));
        assert_eq!(ctl.session().phase(), Phase::Finished);
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Graded));

        assert_eq!(backend.grade_calls(), 1);
        let submitted = backend.last_submission().unwrap();
        assert_eq!(submitted.answers.len(), 2);
        assert_eq!(submitted.answers.get(&ids[0]), Some(key("B")));
        assert_eq!(submitted.answers.get(&ids[1]), Some(key("A")));
        assert!(!submitted.answers.contains(&ids[2]));

        let result = ctl.session().result().unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.review.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_expiry() {
        let backend = Arc::new(MockBackend::new(1));
        let mut ctl = controller(&backend, 1, 1);
        ctl.start().await.unwrap();
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Expired));
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Graded));

        let quiet = tokio::time::timeout(Duration::from_secs(10), ctl.next_update()).await;
        assert!(quiet.is_err(), "timer should be stopped after finishing");
        assert_eq!(backend.grade_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_advance_submits() {
        let backend = Arc::new(MockBackend::new(2));
        let mut ctl = controller(&backend, 2, 600);
        ctl.start().await.unwrap();

        ctl.select_answer(key("A"));
        assert_eq!(ctl.advance(), Phase::InProgress);
        ctl.select_answer(key("A"));
        assert_eq!(ctl.advance(), Phase::Finished);
        assert_eq!(ctl.advance(), Phase::Finished);
        assert!(!ctl.finish());

        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Graded));
        let result = ctl.session().result().unwrap();
        assert_eq!(result.score, 2);
        assert!(result.passed);
        assert_eq!(backend.grade_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_twice_submits_once() {
        let backend = Arc::new(MockBackend::new(3));
        let mut ctl = controller(&backend, 3, 600);
        ctl.start().await.unwrap();

        assert!(ctl.finish());
        assert!(!ctl.finish());
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Graded));
        assert_eq!(backend.grade_calls(), 1);
        assert!(backend.last_submission().unwrap().answers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_grade_is_observable() {
        let backend =
            Arc::new(MockBackend::new(2).with_grading_delay(Duration::from_secs(30)));
        let mut ctl = controller(&backend, 2, 600);
        ctl.start().await.unwrap();
        assert!(ctl.finish());

        assert_eq!(ctl.session().phase(), Phase::Finished);
        assert!(ctl.session().result().is_none());
        assert_eq!(ctl.session().grading_state(), GradingState::Awaiting);

        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Graded));
        assert_eq!(ctl.session().grading_state(), GradingState::Graded);
    }

    #[tokio::test(start_paused = true)]
    async fn grading_failure_is_flagged() {
        let backend = Arc::new(
            MockBackend::new(2).with_grading_error(GradingError::ApiError {
                status: 502,
                message: "bad gateway".into(),
            }),
        );
        let mut ctl = controller(&backend, 2, 600);
        ctl.start().await.unwrap();
        ctl.select_answer(key("C"));
        ctl.finish();

        let update = ctl.next_update().await.unwrap();
        assert!(matches!(update, ExamUpdate::GradingFailed(GradingError::ApiError { status: 502, .. })));
        assert_eq!(ctl.session().grading_state(), GradingState::Unavailable);
        assert_eq!(ctl.session().answered_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_discards_late_grading_reply() {
        let backend = Arc::new(MockBackend::new(2).with_grading_delay(Duration::from_secs(3)));
        let mut ctl = controller(&backend, 2, 600);
        ctl.start().await.unwrap();
        ctl.select_answer(key("A"));
        ctl.finish();
        ctl.abort();

        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Stale));
        assert!(ctl.session().result().is_none());
        assert_eq!(ctl.session().phase(), Phase::NotStarted);
        assert!(ctl.session().answers().is_empty());
        assert_eq!(ctl.session().time_remaining(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_the_countdown() {
        let backend = Arc::new(MockBackend::new(2));
        let mut ctl = controller(&backend, 2, 5);
        ctl.start().await.unwrap();
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Ticked { remaining: 4 }));
        ctl.abort();

        let quiet = tokio::time::timeout(Duration::from_secs(30), ctl.next_update()).await;
        assert!(quiet.is_err(), "no ticks after abort");
        assert_eq!(backend.grade_calls(), 0);
        assert_eq!(ctl.session().time_remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_ignores_previous_session_reply() {
        let backend =
            Arc::new(MockBackend::new(2).with_grading_delay(Duration::from_millis(500)));
        let mut ctl = controller(&backend, 2, 600);
        ctl.start().await.unwrap();
        ctl.finish();

        ctl.start().await.unwrap();
        assert_eq!(ctl.session().phase(), Phase::InProgress);
        assert_eq!(ctl.next_update().await, Some(ExamUpdate::Stale));
        assert_eq!(ctl.session().phase(), Phase::InProgress);
        assert!(ctl.session().result().is_none());
        assert_eq!(
            ctl.next_update().await,
            Some(ExamUpdate::Ticked { remaining: 599 })
        );
        assert_eq!(backend.batch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_stays_not_started() {
        let backend = Arc::new(MockBackend::new(59));
        let mut ctl = controller(&backend, 60, 3600);
        let err = ctl.start().await.unwrap_err();
        assert!(matches!(err, ProviderError::WrongBatchSize { expected: 60, actual: 59 }));
        assert_eq!(ctl.session().phase(), Phase::NotStarted);

        let quiet = tokio::time::timeout(Duration::from_secs(5), ctl.next_update()).await;
        assert!(quiet.is_err(), "no timer for a session that never started");
    }
}

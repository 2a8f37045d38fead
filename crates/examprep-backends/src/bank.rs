//! Local question bank backend.
//!
//! Loads a JSON array of questions that still carry their `correct` flags,
//! serves them with the flags stripped, and grades locally. This lets the
//! client run without a server.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use examprep_core::error::{GradingError, ProviderError};
use examprep_core::model::{
    Answer, AnswerKey, BackendStatus, ExamBatch, ExamSubmission, GradeReport, PracticeFeedback,
    Question, QuestionId, ReviewedAnswer, ReviewedQuestion,
};
use examprep_core::traits::{GradingService, QuestionProvider};

/// Default share of correct answers needed to pass (45 of 60).
pub const DEFAULT_PASS_RATIO: f64 = 0.75;

/// A question as stored in the bank file, correctness included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankQuestion {
    pub id: QuestionId,
    pub subject: String,
    pub question_text: String,
    pub answers: Vec<BankAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAnswer {
    pub key: AnswerKey,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl BankQuestion {
    fn correct_key(&self) -> Option<AnswerKey> {
        self.answers.iter().find(|a| a.correct).map(|a| a.key)
    }

    /// The unanswered form handed to the client.
    fn strip_correct_flag(&self) -> Question {
        Question {
            id: self.id.clone(),
            subject: Some(self.subject.clone()),
            question_text: self.question_text.clone(),
            answers: self
                .answers
                .iter()
                .map(|a| Answer {
                    key: a.key,
                    text: a.text.clone(),
                })
                .collect(),
        }
    }

    fn review(&self, selected: Option<AnswerKey>) -> ReviewedQuestion {
        let correct_key = self.correct_key();
        ReviewedQuestion {
            id: self.id.clone(),
            question_text: self.question_text.clone(),
            answers: self
                .answers
                .iter()
                .map(|a| ReviewedAnswer {
                    key: a.key,
                    text: a.text.clone(),
                    correct: a.correct,
                    selected: selected == Some(a.key),
                })
                .collect(),
            user_correct: Some(selected.is_some() && selected == correct_key),
        }
    }
}

/// Question provider and grading service over an in-memory bank.
pub struct QuestionBank {
    source: Option<PathBuf>,
    questions: Vec<BankQuestion>,
    by_id: HashMap<QuestionId, usize>,
    by_subject: BTreeMap<String, Vec<usize>>,
    exam_size: usize,
    pass_ratio: f64,
    rng: Mutex<StdRng>,
}

impl QuestionBank {
    /// Build a bank, checking that every question has a unique id, unique
    /// answer keys and exactly one correct answer.
    pub fn new(questions: Vec<BankQuestion>, exam_size: usize) -> Result<Self> {
        anyhow::ensure!(!questions.is_empty(), "question bank is empty");

        let mut by_id = HashMap::with_capacity(questions.len());
        let mut by_subject: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, q) in questions.iter().enumerate() {
            let correct = q.answers.iter().filter(|a| a.correct).count();
            anyhow::ensure!(
                correct == 1,
                "question {} has {correct} correct answers, expected 1",
                q.id
            );
            let keys: HashSet<_> = q.answers.iter().map(|a| a.key).collect();
            anyhow::ensure!(
                keys.len() == q.answers.len(),
                "question {} has duplicate answer keys",
                q.id
            );
            anyhow::ensure!(
                by_id.insert(q.id.clone(), i).is_none(),
                "duplicate question id {}",
                q.id
            );
            by_subject.entry(q.subject.clone()).or_default().push(i);
        }

        Ok(Self {
            source: None,
            questions,
            by_id,
            by_subject,
            exam_size,
            pass_ratio: DEFAULT_PASS_RATIO,
            rng: Mutex::new(StdRng::from_os_rng()),
        })
    }

    /// Load a bank from a JSON file.
    pub fn load(path: &Path, exam_size: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank: {}", path.display()))?;
        let questions: Vec<BankQuestion> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse question bank: {}", path.display()))?;
        let mut bank = Self::new(questions, exam_size)
            .with_context(|| format!("invalid question bank: {}", path.display()))?;
        bank.source = Some(path.to_path_buf());
        Ok(bank)
    }

    /// Make question selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Set the share of correct answers needed to pass, in `0.0..=1.0`.
    pub fn with_pass_ratio(mut self, ratio: f64) -> Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&ratio),
            "pass_ratio must be between 0 and 1, got {ratio}"
        );
        self.pass_ratio = ratio;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Correct answers needed to pass an exam of `total` questions.
    pub fn required(&self, total: u32) -> u32 {
        (f64::from(total) * self.pass_ratio).ceil() as u32
    }

    fn question(&self, id: &QuestionId) -> Option<&BankQuestion> {
        self.by_id.get(id).map(|&i| &self.questions[i])
    }
}

#[async_trait]
impl QuestionProvider for QuestionBank {
    fn name(&self) -> &str {
        "bank"
    }

    async fn subjects(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.by_subject.keys().cloned().collect())
    }

    async fn practice_question(&self, subject: &str) -> Result<Question, ProviderError> {
        let pool = self
            .by_subject
            .get(subject)
            .ok_or_else(|| ProviderError::NotFound(format!("subject '{subject}'")))?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let &i = pool
            .choose(&mut *rng)
            .ok_or_else(|| ProviderError::NotFound(format!("subject '{subject}'")))?;
        Ok(self.questions[i].strip_correct_flag())
    }

    async fn submit_practice_answer(
        &self,
        question: &QuestionId,
        key: AnswerKey,
    ) -> Result<PracticeFeedback, ProviderError> {
        let q = self
            .question(question)
            .ok_or_else(|| ProviderError::NotFound(format!("question {question}")))?;
        let correct_answer = q
            .correct_key()
            .ok_or_else(|| ProviderError::NotFound(format!("answer key for {question}")))?;
        Ok(PracticeFeedback {
            correct: Some(key == correct_answer),
            correct_answer,
        })
    }

    async fn exam_batch(&self) -> Result<ExamBatch, ProviderError> {
        if self.questions.len() < self.exam_size {
            return Err(ProviderError::NotEnoughQuestions {
                needed: self.exam_size,
                available: self.questions.len(),
            });
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let questions: Vec<Question> = self
            .questions
            .choose_multiple(&mut *rng, self.exam_size)
            .map(BankQuestion::strip_correct_flag)
            .collect();
        debug!(questions = questions.len(), "sampled exam batch");
        Ok(ExamBatch::new(questions))
    }

    async fn status(&self) -> Result<BackendStatus, ProviderError> {
        let message = match &self.source {
            Some(path) => format!("local question bank {}", path.display()),
            None => "local question bank".to_string(),
        };
        Ok(BackendStatus {
            message,
            questions: self.questions.len(),
            subjects: self.by_subject.len(),
        })
    }
}

#[async_trait]
impl GradingService for QuestionBank {
    async fn grade_exam(&self, submission: &ExamSubmission) -> Result<GradeReport, GradingError> {
        let mut review = Vec::with_capacity(submission.questions.len());
        for id in &submission.questions {
            let Some(q) = self.question(id) else {
                return Err(GradingError::Malformed(format!(
                    "question {id} is not in the bank"
                )));
            };
            review.push(q.review(submission.answers.get(id)));
        }
        for (id, _) in submission.answers.iter() {
            if !submission.questions.contains(id) {
                warn!(question = %id, "ignoring answer for a question outside the exam");
            }
        }

        let score = review.iter().filter(|q| q.is_correct()).count() as u32;
        let total = submission.questions.len() as u32;
        let required = self.required(total);
        Ok(GradeReport {
            score,
            total,
            passed: score >= required,
            required: Some(required),
            review,
        })
    }
}

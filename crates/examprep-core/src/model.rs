//! Core data model types for examprep.
//!
//! Questions arrive from the provider in their unanswered form (no
//! correctness data). Correctness is only ever revealed by the grading
//! service, in the reviewed form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ProviderError;

/// Opaque question identifier.
///
/// The wire format uses integers, but nothing in the client depends on
/// that, so ids are kept as strings. Answer-map keys are strings on the
/// wire either way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for QuestionId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => QuestionId(n.to_string()),
            Raw::Str(s) => QuestionId(s),
        })
    }
}

/// Single-character answer identifier, unique within a question ("A".."D").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnswerKey(char);

impl AnswerKey {
    /// Create a key from a character. Letters are upper-cased.
    pub fn new(c: char) -> Option<Self> {
        if c.is_ascii_alphanumeric() {
            Some(Self(c.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnswerKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                AnswerKey::new(c).ok_or_else(|| format!("invalid answer key: {s}"))
            }
            _ => Err(format!("answer key must be a single character: {s:?}")),
        }
    }
}

impl Serialize for AnswerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        serializer.serialize_str(self.0.encode_utf8(&mut buf))
    }
}

impl<'de> Deserialize<'de> for AnswerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An answer option in its unanswered form. Carries no correctness data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub key: AnswerKey,
    pub text: String,
}

/// A single-choice question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    /// Subject pool the question was drawn from, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub question_text: String,
    pub answers: Vec<Answer>,
}

impl Question {
    /// Look up an answer option by key.
    pub fn answer(&self, key: AnswerKey) -> Option<&Answer> {
        self.answers.iter().find(|a| a.key == key)
    }

    /// Structural checks: non-empty id and text, at least two options,
    /// unique option keys.
    pub fn validate(&self) -> Result<(), ProviderError> {
        let malformed = |reason: &str| ProviderError::MalformedQuestion {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };

        if self.id.as_str().trim().is_empty() {
            return Err(malformed("empty id"));
        }
        if self.question_text.trim().is_empty() {
            return Err(malformed("empty question text"));
        }
        if self.answers.len() < 2 {
            return Err(malformed("fewer than two answer options"));
        }
        for (i, answer) in self.answers.iter().enumerate() {
            if self.answers[..i].iter().any(|a| a.key == answer.key) {
                return Err(malformed(&format!("duplicate answer key {}", answer.key)));
            }
        }
        Ok(())
    }
}

/// An exam question batch as returned by the provider.
///
/// The timestamps are informational; the countdown always uses the
/// configured duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamBatch {
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub ends_at: Option<NaiveDateTime>,
    pub questions: Vec<Question>,
}

impl ExamBatch {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            started_at: None,
            ends_at: None,
            questions,
        }
    }
}

/// Committed exam answers, question id → selected key.
///
/// Serializes as a flat JSON object, which is the grading request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(BTreeMap<QuestionId, AnswerKey>);

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection. Returns `false` if the question already has one;
    /// the first selection stands.
    pub fn record(&mut self, id: QuestionId, key: AnswerKey) -> bool {
        match self.0.entry(id) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(key);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, id: &QuestionId) -> Option<AnswerKey> {
        self.0.get(id).copied()
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, AnswerKey)> {
        self.0.iter().map(|(id, key)| (id, *key))
    }
}

impl FromIterator<(QuestionId, AnswerKey)> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = (QuestionId, AnswerKey)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity of one exam session lifecycle.
///
/// Ticks and grading replies carry the id of the session that produced
/// them; a mismatch marks them stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The one-shot grading request issued when an exam finishes.
#[derive(Debug, Clone)]
pub struct ExamSubmission {
    /// Session that produced this submission.
    pub session: SessionId,
    /// Committed answers; may be partial or empty.
    pub answers: AnswerSheet,
    /// Exam question ids in exam order.
    pub questions: Vec<QuestionId>,
}

/// An answer option in its reviewed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedAnswer {
    pub key: AnswerKey,
    pub text: String,
    pub correct: bool,
    #[serde(default)]
    pub selected: bool,
}

/// A question with correctness revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub answers: Vec<ReviewedAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_correct: Option<bool>,
}

impl ReviewedQuestion {
    pub fn correct_answer(&self) -> Option<&ReviewedAnswer> {
        self.answers.iter().find(|a| a.correct)
    }

    pub fn selected_answer(&self) -> Option<&ReviewedAnswer> {
        self.answers.iter().find(|a| a.selected)
    }

    /// Whether the user's selection was the correct one. Unanswered
    /// questions count as incorrect.
    pub fn is_correct(&self) -> bool {
        self.user_correct
            .unwrap_or_else(|| self.selected_answer().is_some_and(|a| a.correct))
    }
}

/// Grading service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeReport {
    pub score: u32,
    pub total: u32,
    pub passed: bool,
    /// Pass mark, when the service discloses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<u32>,
    #[serde(default)]
    pub review: Vec<ReviewedQuestion>,
}

/// The validated review record held by a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub score: u32,
    pub total: u32,
    pub passed: bool,
    pub required: Option<u32>,
    /// Reviewed questions in exam order.
    pub review: Vec<ReviewedQuestion>,
    pub graded_at: DateTime<Utc>,
}

impl ExamResult {
    /// Score as a fraction of the total, in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total)
        }
    }
}

/// Immediate feedback for a practice answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    pub correct_answer: AnswerKey,
}

impl PracticeFeedback {
    pub fn is_correct(&self, selected: AnswerKey) -> bool {
        self.correct.unwrap_or(selected == self.correct_answer)
    }
}

/// Backend health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub questions: usize,
    #[serde(default)]
    pub subjects: usize,
}

//! Exam configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed exam parameters. Neither value is derived from the fetched batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    /// Number of questions in one exam (N).
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Countdown length in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
}

fn default_question_count() -> usize {
    60
}

fn default_duration_secs() -> u32 {
    60 * 60
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            duration_secs: default_duration_secs(),
        }
    }
}

impl ExamConfig {
    pub fn new(question_count: usize, duration_secs: u32) -> Self {
        Self {
            question_count,
            duration_secs,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Reject configurations no exam could run under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.question_count == 0 {
            return Err(ConfigError::NoQuestions);
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::NoTime);
        }
        Ok(())
    }
}

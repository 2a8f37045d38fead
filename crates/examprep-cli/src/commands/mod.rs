pub mod exam;
pub mod init;
pub mod practice;
pub mod status;
pub mod subjects;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use examprep_backends::config::{create_backend, load_config_from, Backend};
use examprep_core::config::ExamConfig;
use examprep_core::model::{AnswerKey, Question};

/// Command-line overrides for the `[exam]` config section.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ExamOverrides {
    pub questions: Option<usize>,
    pub duration: Option<u32>,
}

/// Load the config, apply `overrides` and build the selected backend.
pub(crate) fn connect(
    config_path: Option<&Path>,
    backend: Option<&str>,
    overrides: ExamOverrides,
) -> Result<(Backend, ExamConfig)> {
    let config = load_config_from(config_path)?;
    let mut exam = config.exam;
    if let Some(questions) = overrides.questions {
        exam.question_count = questions;
    }
    if let Some(duration) = overrides.duration {
        exam.duration_secs = duration;
    }
    exam.validate().context("invalid exam settings")?;

    let (name, backend_config) = config.backend(backend)?;
    debug!(backend = name, ?backend_config, ?exam, "connecting");
    let backend = create_backend(name, backend_config, &exam)?;
    Ok((backend, exam))
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Answer(AnswerKey),
    Skip,
    Finish,
    Quit,
    Unknown,
}

/// Interpret a line typed while `question` is shown.
///
/// A single character naming one of the question's options is always an
/// answer, so option keys shadow the one-letter commands.
pub(crate) fn parse_input(line: &str, question: Option<&Question>) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let key = line.parse::<AnswerKey>().ok();
    if let (Some(key), Some(q)) = (key, question) {
        if q.answer(key).is_some() {
            return Some(Input::Answer(key));
        }
    }
    let input = match line.to_ascii_lowercase().as_str() {
        "s" | "skip" => Input::Skip,
        "f" | "finish" => Input::Finish,
        "q" | "quit" => Input::Quit,
        _ => key.map_or(Input::Unknown, Input::Answer),
    };
    Some(input)
}

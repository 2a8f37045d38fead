//! The `examprep practice` command.

use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use examprep_core::PracticeLoop;

use super::{parse_input, ExamOverrides, Input};
use crate::render;

pub async fn execute(
    config_path: Option<&Path>,
    backend: Option<&str>,
    subject: String,
    rounds: Option<u32>,
) -> Result<()> {
    anyhow::ensure!(rounds != Some(0), "rounds must be at least 1");
    let (backend, _) = super::connect(config_path, backend, ExamOverrides::default())?;
    let mut practice = PracticeLoop::new(backend.questions, subject);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Practicing {}. Type an option key to answer, s to skip, q to quit.",
        practice.subject()
    );

    let mut asked = 0;
    'questions: while rounds.is_none_or(|r| asked < r) {
        render::question(practice.next_question().await?);
        asked += 1;

        loop {
            let Some(line) = lines.next_line().await? else {
                break 'questions;
            };
            match parse_input(&line, practice.current()) {
                None => continue,
                Some(Input::Answer(key)) => match practice.answer(key).await? {
                    Some(feedback) => {
                        render::feedback(feedback, key);
                        break;
                    }
                    None => println!("{key} is not an option."),
                },
                Some(Input::Skip) => break,
                Some(Input::Finish | Input::Quit) => break 'questions,
                Some(Input::Unknown) => println!("Type one of the option keys."),
            }
        }
    }

    let (correct, answered) = practice.tally();
    println!("\nAnswered {answered}, {correct} correct.");
    Ok(())
}

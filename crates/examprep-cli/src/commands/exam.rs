//! The `examprep exam` command.

use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use examprep_core::session::{format_remaining, GradingState, Phase};
use examprep_core::{ExamController, ExamUpdate};

use super::{parse_input, ExamOverrides, Input};
use crate::render;

pub async fn execute(
    config_path: Option<&Path>,
    backend: Option<&str>,
    questions: Option<usize>,
    duration: Option<u32>,
) -> Result<()> {
    let (backend, exam) = super::connect(
        config_path,
        backend,
        ExamOverrides {
            questions,
            duration,
        },
    )?;
    info!(backend = %backend.name, ?exam, "starting exam");

    let mut controller = ExamController::new(backend.questions, backend.grading, exam);
    controller.start().await?;

    println!(
        "{} questions, {} on the clock. Type an option key to answer, s to skip, f to finish, q to quit.",
        exam.question_count,
        format_remaining(exam.duration_secs)
    );
    show_current(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match controller.session().phase() {
            Phase::InProgress => {}
            Phase::Finished => break,
            Phase::NotStarted => {
                println!("\nExam abandoned.");
                return Ok(());
            }
        }

        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_input(&mut controller, &line),
                None => {
                    controller.abort();
                    println!("\nInput closed, exam abandoned.");
                    return Ok(());
                }
            },
            Some(update) = controller.next_update() => match update {
                ExamUpdate::Ticked { remaining } if is_reminder(remaining) => {
                    println!("[{} left]", format_remaining(remaining));
                }
                ExamUpdate::Expired => println!("\nTime is up!"),
                _ => {}
            },
        }
    }

    let session = controller.session();
    println!(
        "\nSubmitted {} of {} answers. Grading...",
        session.answered_count(),
        session.question_count()
    );
    while controller.session().grading_state() == GradingState::Awaiting {
        if controller.next_update().await.is_none() {
            break;
        }
    }

    let session = controller.session();
    if let Some(err) = session.grading_error() {
        anyhow::bail!("grading failed, no result is available: {err}");
    }
    let Some(result) = session.result() else {
        anyhow::bail!("grading did not produce a result");
    };
    println!("\n{}", render::result_table(result));
    render::review(&result.review);
    Ok(())
}

fn handle_input(controller: &mut ExamController, line: &str) {
    match parse_input(line, controller.session().current_question()) {
        None => {}
        Some(Input::Answer(key)) => {
            if controller.select_answer(key) {
                controller.advance();
                show_current(controller);
            } else {
                println!("{key} is not an option.");
            }
        }
        Some(Input::Skip) => {
            controller.advance();
            show_current(controller);
        }
        Some(Input::Finish) => {
            controller.finish();
        }
        Some(Input::Quit) => controller.abort(),
        Some(Input::Unknown) => {
            println!("Type an option key, s to skip, f to finish or q to quit.");
        }
    }
}

fn show_current(controller: &ExamController) {
    let session = controller.session();
    if session.phase() != Phase::InProgress {
        return;
    }
    if let Some(question) = session.current_question() {
        render::exam_header(
            session.index(),
            session.question_count(),
            session.time_remaining(),
        );
        render::question(question);
    }
}

/// Remind every five minutes, then every minute, then at 30 and 10 seconds.
fn is_reminder(remaining: u32) -> bool {
    match remaining {
        0 => false,
        r if r > 300 => r % 300 == 0,
        r if r > 60 => r % 60 == 0,
        r => r == 60 || r == 30 || r == 10,
    }
}

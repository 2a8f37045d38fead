//! Terminal rendering for questions, feedback and results.

use comfy_table::{Cell, Table};

use examprep_core::model::{AnswerKey, ExamResult, PracticeFeedback, Question, ReviewedQuestion};
use examprep_core::session::format_remaining;

pub fn question(question: &Question) {
    println!("\n{}", question.question_text);
    for answer in &question.answers {
        println!("  {}) {}", answer.key, answer.text);
    }
}

/// Question header during an exam, e.g. `Question 3/60 [57:12]`.
pub fn exam_header(position: usize, total: usize, remaining: u32) {
    println!(
        "\nQuestion {}/{} [{}]",
        position + 1,
        total,
        format_remaining(remaining)
    );
}

pub fn feedback(feedback: &PracticeFeedback, selected: AnswerKey) {
    if feedback.is_correct(selected) {
        println!("Correct!");
    } else {
        println!("Wrong. The correct answer is {}.", feedback.correct_answer);
    }
}

pub fn result_table(result: &ExamResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Score", "Required", "Percent", "Result"]);
    table.add_row(vec![
        Cell::new(format!("{}/{}", result.score, result.total)),
        Cell::new(
            result
                .required
                .map_or_else(|| "-".to_string(), |r| r.to_string()),
        ),
        Cell::new(format!("{:.1}%", result.ratio() * 100.0)),
        Cell::new(if result.passed { "PASSED" } else { "FAILED" }),
    ]);
    table
}

pub fn review(review: &[ReviewedQuestion]) {
    for (i, q) in review.iter().enumerate() {
        println!("\n{}. {}", i + 1, q.question_text);
        for answer in &q.answers {
            let marker = match (answer.correct, answer.selected) {
                (true, _) => '*',
                (false, true) => 'x',
                (false, false) => ' ',
            };
            println!("  {marker} {}) {}", answer.key, answer.text);
        }
        match q.selected_answer() {
            Some(selected) if q.is_correct() => println!("  Your answer {} is correct.", selected.key),
            Some(selected) => println!("  Your answer {} is wrong.", selected.key),
            None => println!("  Not answered."),
        }
    }
}

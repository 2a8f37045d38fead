//! The `examprep init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("examprep.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("questions.json"), SAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Run: examprep subjects");
    println!("  2. Run: examprep practice --subject Banking");
    println!("  3. Run: examprep exam");
    println!("  To use an exam server, set EXAMPREP_API_BASE and pass --backend remote");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examprep configuration

default_backend = "local"

[backends.local]
type = "bank"
path = "questions.json"
pass_ratio = 0.75

[backends.remote]
type = "http"
base_url = "${EXAMPREP_API_BASE}"
timeout_secs = 30

[exam]
# The full exam is 60 questions in 60 minutes; the sample bank is smaller.
question_count = 5
duration_secs = 300
"#;

const SAMPLE_BANK: &str = r#"[
  {
    "id": 1,
    "subject": "Banking",
    "questionText": "Which institution usually sets the base interest rate?",
    "answers": [
      { "key": "A", "text": "The central bank", "correct": true },
      { "key": "B", "text": "Commercial banks", "correct": false },
      { "key": "C", "text": "The stock exchange", "correct": false },
      { "key": "D", "text": "The tax authority", "correct": false }
    ]
  },
  {
    "id": 2,
    "subject": "Banking",
    "questionText": "What does a current account primarily offer?",
    "answers": [
      { "key": "A", "text": "Long-term fixed returns", "correct": false },
      { "key": "B", "text": "Day-to-day payments and withdrawals", "correct": true },
      { "key": "C", "text": "Insurance cover", "correct": false },
      { "key": "D", "text": "Equity ownership", "correct": false }
    ]
  },
  {
    "id": 3,
    "subject": "Banking",
    "questionText": "What is collateral?",
    "answers": [
      { "key": "A", "text": "An interest payment", "correct": false },
      { "key": "B", "text": "A bank fee", "correct": false },
      { "key": "C", "text": "An asset pledged to secure a loan", "correct": true },
      { "key": "D", "text": "A type of deposit", "correct": false }
    ]
  },
  {
    "id": 4,
    "subject": "Insurance",
    "questionText": "What is an insurance premium?",
    "answers": [
      { "key": "A", "text": "The payout after a claim", "correct": false },
      { "key": "B", "text": "The price paid for cover", "correct": true },
      { "key": "C", "text": "The insurer's profit", "correct": false },
      { "key": "D", "text": "A policy exclusion", "correct": false }
    ]
  },
  {
    "id": 5,
    "subject": "Insurance",
    "questionText": "What is a deductible?",
    "answers": [
      { "key": "A", "text": "The part of a loss the policyholder bears", "correct": true },
      { "key": "B", "text": "A discount for new customers", "correct": false },
      { "key": "C", "text": "A tax on premiums", "correct": false },
      { "key": "D", "text": "The maximum payout", "correct": false }
    ]
  },
  {
    "id": 6,
    "subject": "Insurance",
    "questionText": "Who bears the risk under an insurance contract?",
    "answers": [
      { "key": "A", "text": "The broker", "correct": false },
      { "key": "B", "text": "The policyholder", "correct": false },
      { "key": "C", "text": "The regulator", "correct": false },
      { "key": "D", "text": "The insurer", "correct": true }
    ]
  }
]
"#;

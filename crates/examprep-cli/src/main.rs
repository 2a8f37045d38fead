//! examprep CLI: timed exams and practice quizzes in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "examprep", version, about = "Timed exam and practice quiz client")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend to use (defaults to `default_backend` from the config)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the subjects available for practice
    Subjects,

    /// Show the backend's status message
    Status,

    /// Practice one subject with immediate feedback
    Practice {
        /// Subject to practice
        #[arg(long)]
        subject: String,

        /// Stop after this many questions
        #[arg(long)]
        rounds: Option<u32>,
    },

    /// Sit a timed exam
    Exam {
        /// Number of questions (overrides the config)
        #[arg(long)]
        questions: Option<usize>,

        /// Time limit in seconds (overrides the config)
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Create a starter config and sample question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let backend = cli.backend.as_deref();

    let result = match cli.command {
        Commands::Subjects => commands::subjects::execute(config, backend).await,
        Commands::Status => commands::status::execute(config, backend).await,
        Commands::Practice { subject, rounds } => {
            commands::practice::execute(config, backend, subject, rounds).await
        }
        Commands::Exam {
            questions,
            duration,
        } => commands::exam::execute(config, backend, questions, duration).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

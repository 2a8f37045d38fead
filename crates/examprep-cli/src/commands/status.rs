//! The `examprep status` command.

use std::path::Path;

use anyhow::Result;

use super::ExamOverrides;

pub async fn execute(config_path: Option<&Path>, backend: Option<&str>) -> Result<()> {
    let (backend, _) = super::connect(config_path, backend, ExamOverrides::default())?;
    let status = backend.questions.status().await?;

    println!("Backend: {} ({})", backend.name, backend.questions.name());
    println!("  {}", status.message);
    if status.questions > 0 {
        println!(
            "  {} questions across {} subjects",
            status.questions, status.subjects
        );
    }
    Ok(())
}

//! The `examprep subjects` command.

use std::path::Path;

use anyhow::Result;

use super::ExamOverrides;

pub async fn execute(config_path: Option<&Path>, backend: Option<&str>) -> Result<()> {
    let (backend, _) = super::connect(config_path, backend, ExamOverrides::default())?;
    let subjects = backend.questions.subjects().await?;

    if subjects.is_empty() {
        println!("No subjects available from {}.", backend.name);
        return Ok(());
    }
    for subject in &subjects {
        println!("{subject}");
    }
    Ok(())
}

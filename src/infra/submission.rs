// ============================================================
// Layer 6 — Submission Writer
// ============================================================
// Produces the two files the competition platform expects:
//
//   submission.json — which competition, which runtime, which
//                     script to run
//   main.py         — when the platform runs it, writes every
//                     predicted label, one per line, to the path
//                     in an environment variable
//
// The predictions are baked into main.py as one string literal
// whose lines are separated by the two characters `\n`, e.g.
//
//   PREDICTIONS = "3\n8\n8\n0"
//
// Upload and login are handled by the platform's own CLI.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::traits::PredictionSink;

const DESCRIPTOR_FILE: &str = "submission.json";
const ENTRY_SCRIPT: &str = "main.py";

/// Contents of `submission.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDescriptor {
    pub competition: String,
    pub environment: String,
    pub entrypoint:  String,
}

pub struct SubmissionWriter {
    dir:            PathBuf,
    competition:    String,
    environment:    String,
    output_env_var: String,
}

impl SubmissionWriter {
    pub fn new(
        dir:            impl Into<PathBuf>,
        competition:    impl Into<String>,
        environment:    impl Into<String>,
        output_env_var: impl Into<String>,
    ) -> Self {
        Self {
            dir:            dir.into(),
            competition:    competition.into(),
            environment:    environment.into(),
            output_env_var: output_env_var.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn descriptor(&self) -> SubmissionDescriptor {
        SubmissionDescriptor {
            competition: self.competition.clone(),
            environment: self.environment.clone(),
            entrypoint:  ENTRY_SCRIPT.to_string(),
        }
    }

    /// Render the entry script for `predictions`. The variable name goes
    /// in as a JSON string, which is also a valid Python string literal.
    pub fn render_script(&self, predictions: &[usize]) -> Result<String> {
        let encoded = predictions
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("\\n");
        let var = serde_json::to_string(&self.output_env_var)?;

        Ok(format!(
            "import os\n\
             \n\
             PREDICTIONS = \"{encoded}\"\n\
             \n\
             with open(os.environ[{var}], \"w\") as f:\n\
             \x20   f.write(PREDICTIONS)\n",
        ))
    }

    fn write_files(&self, predictions: &[usize]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create directory '{}'", self.dir.display()))?;

        let descriptor_path = self.dir.join(DESCRIPTOR_FILE);
        fs::write(&descriptor_path, serde_json::to_string_pretty(&self.descriptor())?)
            .with_context(|| format!("Cannot write '{}'", descriptor_path.display()))?;

        let script_path = self.dir.join(ENTRY_SCRIPT);
        fs::write(&script_path, self.render_script(predictions)?)
            .with_context(|| format!("Cannot write '{}'", script_path.display()))?;
        make_executable(&script_path)?;

        tracing::info!(
            "Wrote submission for '{}' ({} predictions) to '{}'",
            self.competition,
            predictions.len(),
            self.dir.display()
        );
        Ok(())
    }
}

impl PredictionSink for SubmissionWriter {
    fn publish(&self, predictions: &[usize]) -> Result<()> {
        self.write_files(predictions)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Cannot mark '{}' executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn writer(dir: &Path) -> SubmissionWriter {
        SubmissionWriter::new(dir, "cifar-10", "python3", "OUTPUT_PATH")
    }

    #[test]
    fn test_script_uses_escaped_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let script = writer(dir.path()).render_script(&[3, 8, 0]).unwrap();
        assert!(script.contains(r#"PREDICTIONS = "3\n8\n0""#));
        assert!(script.contains(r#"os.environ["OUTPUT_PATH"]"#));
    }

    #[test]
    fn test_publish_creates_directory_and_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("submission");
        writer(&target).publish(&[1, 2]).unwrap();

        let descriptor: SubmissionDescriptor =
            serde_json::from_str(&fs::read_to_string(target.join(DESCRIPTOR_FILE)).unwrap()).unwrap();
        assert_eq!(descriptor.competition, "cifar-10");
        assert_eq!(descriptor.environment, "python3");
        assert_eq!(descriptor.entrypoint, "main.py");

        let script = fs::read_to_string(target.join(ENTRY_SCRIPT)).unwrap();
        assert!(script.contains(r#""1\n2""#));
    }

    #[test]
    fn test_empty_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let script = writer(dir.path()).render_script(&[]).unwrap();
        assert!(script.contains(r#"PREDICTIONS = """#));
    }

    #[test]
    fn test_quote_in_env_var_name_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let script = SubmissionWriter::new(dir.path(), "c", "python3", "OUT\"PATH")
            .render_script(&[4])
            .unwrap();
        assert!(script.contains(r#"os.environ["OUT\"PATH"]"#));
    }
}

// ============================================================
// Layer 6 — Run Artifacts
// ============================================================
// Everything a run leaves behind besides the submission:
//
//   <output_dir>/
//     run_config.json            ← the effective TrainConfig
//     loss_trace.json            ← {"train": [...], "valid": [...]}
//     classification_report.txt  ← validation report + confusion matrix
//
// The loss trace is the input for plotting; the report is the
// text a reviewer reads. Model weights are not saved.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, making the directory if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        self.write_json("run_config.json", cfg)
    }

    pub fn save_loss_trace<T: Serialize>(&self, trace: &T) -> Result<()> {
        self.write_json("loss_trace.json", trace)
    }

    pub fn save_report(&self, report: &str) -> Result<()> {
        let path = self.dir.join("classification_report.txt");
        fs::write(&path, report)
            .with_context(|| format!("Cannot write report to '{}'", path.display()))?;
        tracing::debug!("Saved classification report to '{}'", path.display());
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }
}

/// Read a JSON file into `T`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Cannot parse '{}'", path.display()))
}

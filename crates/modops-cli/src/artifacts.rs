//! Timestamped artifact folders and their summary records.
//!
//! Artifact-producing tasks (traces, migration scripts, license reports)
//! write into `<ARTIFACTS_DIRECTORY>/<task>-<timestamp>/` and leave behind
//! a `summary.json` describing what was produced.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The machine-readable record written next to a task's output files.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// Generated folder name, e.g. `trace-20260315-142233`.
    pub name: String,
    /// RFC 3339 generation timestamp.
    pub generated_at: String,
    /// Files produced, relative to the artifact folder.
    pub files: Vec<String>,
}

/// One timestamped output folder under the artifacts directory.
#[derive(Debug)]
pub struct ArtifactFolder {
    name: String,
    dir: PathBuf,
    files: Vec<String>,
}

impl ArtifactFolder {
    /// Creates `<artifacts_dir>/<task>-<YYYYMMDD-HHMMSS>/`.
    pub fn create(artifacts_dir: &Path, task: &str) -> Result<Self> {
        let name = format!("{task}-{}", Local::now().format("%Y%m%d-%H%M%S"));
        let dir = artifacts_dir.join(&name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create artifact folder {}", dir.display()))?;
        Ok(Self {
            name,
            dir,
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path for a file inside the folder, without recording it.
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Records a produced file for the summary.
    pub fn record(&mut self, file_name: &str) {
        self.files.push(file_name.to_string());
    }

    /// Records the file only if the tool actually produced it.
    pub fn record_if_exists(&mut self, file_name: &str) -> bool {
        if self.file(file_name).exists() {
            self.record(file_name);
            true
        } else {
            false
        }
    }

    /// Writes `summary.json` and returns its path.
    pub fn write_summary(&self) -> Result<PathBuf> {
        let summary = ArtifactSummary {
            name: self.name.clone(),
            generated_at: Local::now().to_rfc3339(),
            files: self.files.clone(),
        };
        let path = self.dir.join("summary.json");
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

//! Persisted enrollment parameters (`<install>/fleet.yaml`).
//!
//! Written by `outpost enroll`, read by `outpost status` and the agent on
//! start-up. Saves are atomic (temp file + rename).

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::domain::EnrollmentRecord;

pub struct EnrollmentStore {
    path: PathBuf,
}

impl EnrollmentStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or `None` when the agent was never enrolled.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<EnrollmentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let record = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(record))
    }

    /// Replace the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, record: &EnrollmentRecord) -> Result<()> {
        let content = serde_yaml::to_string(record).context("serializing enrollment")?;
        let dir = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("writing temp file {}", temp.path().display()))?;

        // Holds the enrollment token: owner and group only.
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o640))
            .with_context(|| format!("setting permissions on {}", temp.path().display()))?;

        temp.persist(&self.path)
            .with_context(|| format!("finalizing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved enrollment");
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use tracing::info;

use super::index_file::write_atomic;
use crate::application::BriefArchive;
use crate::domain::{Brief, DomainError};

/// Writes each brief as `brief_<YYYYMMDD_HHMMSS>_<summary_id>.txt` in one directory.
pub struct SummaryArchive {
    dir: PathBuf,
}

impl SummaryArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a brief; the summary id keeps same-second briefs apart.
    pub fn file_name(brief: &Brief) -> Result<String, DomainError> {
        let created = DateTime::from_timestamp(brief.created_at(), 0).ok_or_else(|| {
            DomainError::invalid_input(format!(
                "brief timestamp {} is out of range",
                brief.created_at()
            ))
        })?;
        Ok(format!(
            "brief_{}_{}.txt",
            created.format("%Y%m%d_%H%M%S"),
            brief.summary_id()
        ))
    }
}

#[async_trait]
impl BriefArchive for SummaryArchive {
    async fn archive(&self, brief: &Brief) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create summaries directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.dir.join(Self::file_name(brief)?);
        write_atomic(&path, brief.text().as_bytes()).await?;

        info!("Saved brief {} to {}", brief.summary_id(), path.display());
        Ok(path)
    }
}

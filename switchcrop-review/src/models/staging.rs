//! Local file selection before upload

use crate::error::{ReviewError, ReviewResult};
use std::path::{Path, PathBuf};
use switchcrop_common::config::ReviewSection;

/// A locally selected recording awaiting upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
}

/// Why a selected path was not staged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedExtension,
    Unreadable(String),
    NotAFile,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnsupportedExtension => f.write_str("unsupported file type"),
            SkipReason::Unreadable(err) => write!(f, "unreadable: {}", err),
            SkipReason::NotAFile => f.write_str("not a regular file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of one selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub accepted: Vec<UploadedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl StagingReport {
    pub fn total_bytes(&self) -> u64 {
        self.accepted.iter().map(|f| f.size_bytes).sum()
    }
}

/// Which files may be staged and how much may be uploaded at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPolicy {
    /// Lowercase, without the dot
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: u64,
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self::from(&ReviewSection::default())
    }
}

impl From<&ReviewSection> for StagingPolicy {
    fn from(section: &ReviewSection) -> Self {
        Self {
            allowed_extensions: section
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_upload_bytes: section.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl StagingPolicy {
    pub fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }

    /// Inspect the selected paths and sort them into accepted and skipped
    pub async fn inspect(&self, paths: &[PathBuf]) -> StagingReport {
        let mut report = StagingReport::default();

        for path in paths {
            if !self.is_allowed(path) {
                report.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: SkipReason::UnsupportedExtension,
                });
                continue;
            }

            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {
                    let filename = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    report.accepted.push(UploadedFile {
                        path: path.clone(),
                        filename,
                        size_bytes: meta.len(),
                    });
                }
                Ok(_) => report.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: SkipReason::NotAFile,
                }),
                Err(e) => report.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: SkipReason::Unreadable(e.to_string()),
                }),
            }
        }

        report
    }

    /// Guard for submitting an upload
    pub fn check_upload(&self, staged: &[UploadedFile]) -> ReviewResult<()> {
        if staged.is_empty() {
            return Err(ReviewError::Validation(
                "Select at least one audio file before uploading".to_string(),
            ));
        }
        let total: u64 = staged.iter().map(|f| f.size_bytes).sum();
        if total > self.max_upload_bytes {
            return Err(ReviewError::Validation(format!(
                "Selected files total {} bytes, above the {} byte upload limit",
                total, self.max_upload_bytes
            )));
        }
        Ok(())
    }
}

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::BatchReport;

/// The main error type for stripcut operations.
#[derive(Debug, Error)]
pub enum StripcutError {
    #[error("IO error at {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed while traversing {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read image dimensions from {}: {source}", path.display())]
    ImageProbe {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save image {}: {source}", path.display())]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {} is too large ({width}x{height}, limit {limit}px per side)", path.display())]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        limit: u32,
    },

    #[error("Failed to parse settings from {}: {source}", path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write settings to {}: {source}", path.display())]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("PDF error for {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("{failed} of {total} project(s) failed")]
    BatchFailed {
        failed: usize,
        total: usize,
        report: BatchReport,
    },
}

impl StripcutError {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StripcutError::IoAt {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn pdf(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        StripcutError::Pdf {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

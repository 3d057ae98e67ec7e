//! Batch report types.
//!
//! A [`BatchReport`] is produced by both the split pipeline and the quick
//! convert. It renders as a human-readable summary via `Display` and as
//! JSON via serde.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::SplitStrategy;

/// What happened to one project folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// PDF written and folder moved to the success folder.
    Succeeded,
    /// Nothing could be merged.
    NoImages,
    /// No PDF was written.
    Failed,
    /// PDF written, but the folder could not be moved.
    MoveFailed,
}

impl ProjectStatus {
    pub fn is_success(self) -> bool {
        self == ProjectStatus::Succeeded
    }
}

/// One strategy attempt within a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: SplitStrategy,
    /// Segments produced before repacking.
    pub segments: usize,
    /// Why the attempt failed; `None` for the winning attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-project result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectOutcome {
    pub name: String,
    pub status: ProjectStatus,
    pub source_images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SplitStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PathBuf>,
    pub pages: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StrategyAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProjectOutcome {
    pub fn new(name: impl Into<String>, status: ProjectStatus) -> Self {
        Self {
            name: name.into(),
            status,
            source_images: 0,
            strategy: None,
            pdf: None,
            pages: 0,
            attempts: Vec::new(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Summary of a whole batch run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    pub root: PathBuf,
    pub pdf_dir: PathBuf,
    pub success_dir: PathBuf,
    pub projects: Vec<ProjectOutcome>,
}

impl BatchReport {
    pub fn new(root: PathBuf, pdf_dir: PathBuf, success_dir: PathBuf) -> Self {
        Self {
            root,
            pdf_dir,
            success_dir,
            projects: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.projects.len()
    }

    pub fn succeeded(&self) -> usize {
        self.projects
            .iter()
            .filter(|p| p.status.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProjectOutcome> {
        self.projects.iter().filter(|p| !p.status.is_success())
    }

    pub fn is_ok(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.projects.is_empty() {
            writeln!(f, "No projects found in {}", self.root.display())?;
            return Ok(());
        }

        writeln!(f, "Summary:")?;
        writeln!(
            f,
            "  {} project(s): {} succeeded, {} failed",
            self.total(),
            self.succeeded(),
            self.failed()
        )?;

        if self.failed() > 0 {
            writeln!(f)?;
            writeln!(f, "Failed ({}):", self.failed())?;
            for project in self.failures() {
                let reason = match project.status {
                    ProjectStatus::MoveFailed => "move failed",
                    ProjectStatus::NoImages => "no images",
                    _ => "no PDF",
                };
                match &project.message {
                    Some(message) => {
                        writeln!(f, "  - {} ({reason}): {message}", project.name)?
                    }
                    None => writeln!(f, "  - {} ({reason})", project.name)?,
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "PDFs:     {}", self.pdf_dir.display())?;
        writeln!(f, "Moved to: {}", self.success_dir.display())?;
        Ok(())
    }
}

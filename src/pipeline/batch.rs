use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use super::report::{BatchReport, ProjectOutcome, ProjectStatus};
use super::{move_into, process_project, project_name, PipelineConfig};
use crate::error::StripcutError;
use crate::progress::ProgressReporter;
use crate::scan::{self, SUCCESS_DIR};

/// Process every project folder under `root`.
///
/// PDFs go to `<root>/<root-name>_pdfs`. A project folder is moved into
/// `<root>/IMG` if and only if its PDF was written. One project failing
/// never stops the batch.
pub fn process_root(
    root: &Path,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<BatchReport, StripcutError> {
    if !root.is_dir() {
        return Err(StripcutError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    config.validate()?;

    let root = fs::canonicalize(root).map_err(|err| StripcutError::io_at(root, err))?;
    let pdf_dir_name = scan::pdf_dir_name(&root);
    let pdf_dir = root.join(&pdf_dir_name);
    let success_dir = root.join(SUCCESS_DIR);
    for dir in [&pdf_dir, &success_dir] {
        fs::create_dir_all(dir).map_err(|err| StripcutError::io_at(dir, err))?;
    }

    let mut report = BatchReport::new(root.clone(), pdf_dir.clone(), success_dir.clone());
    let projects = scan::discover_projects(&root, &[SUCCESS_DIR, pdf_dir_name.as_str()])?;
    if projects.is_empty() {
        warn!("No project folders found in {}", root.display());
        return Ok(report);
    }

    info!(
        "Processing {} project(s) with the {:?} strategy",
        projects.len(),
        config.strategy
    );
    reporter.on_batch_start(projects.len());

    for (idx, project) in projects.iter().enumerate() {
        let name = project_name(project);
        reporter.on_item_start(idx, projects.len(), &name);

        let mut outcome = match process_project(project, &pdf_dir, config, reporter) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Project {name} failed: {err}");
                ProjectOutcome::new(name.clone(), ProjectStatus::Failed)
                    .with_message(err.to_string())
            }
        };

        if outcome.status.is_success() {
            match move_into(project, &success_dir) {
                Ok(dest) => info!("Moved {name} to {}", dest.display()),
                Err(err) => {
                    error!("Failed to move {name}: {err}");
                    outcome.status = ProjectStatus::MoveFailed;
                    outcome.message = Some(err.to_string());
                }
            }
        } else {
            warn!("{name}: no PDF written; intermediate files kept for inspection");
        }

        reporter.on_item_complete(&name, outcome.status.is_success());
        report.projects.push(outcome);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StrategyChoice;
    use crate::progress::SilentReporter;
    use image::{Rgb, RgbImage};

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = process_root(
            &dir.path().join("nope"),
            &PipelineConfig::default(),
            &SilentReporter,
        )
        .unwrap_err();
        assert!(matches!(err, StripcutError::NotADirectory { .. }));
    }

    #[test]
    fn only_successful_projects_are_moved() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("comics");
        let good = root.join("good");
        let empty = root.join("empty");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(&empty).unwrap();
        RgbImage::from_fn(30, 40, |x, y| Rgb([(x * 9) as u8, (y * 5) as u8, 7]))
            .save(good.join("001.png"))
            .unwrap();

        let config = PipelineConfig {
            strategy: StrategyChoice::SolidBand,
            ..PipelineConfig::default()
        };
        let report = process_root(&root, &config, &SilentReporter).unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert!(report.success_dir.join("good").is_dir());
        assert!(report.pdf_dir.join("good.pdf").is_file());
        assert!(report.root.join("empty").is_dir());
        assert!(!report.success_dir.join("empty").exists());
        assert!(report.pdf_dir.ends_with("comics_pdfs"));
    }
}

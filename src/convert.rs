//! Quick convert: one PDF per image folder, no splitting.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::StripcutError;
use crate::pdf::{self, PdfOptions};
use crate::pipeline::{BatchReport, ProjectOutcome, ProjectStatus};
use crate::progress::ProgressReporter;
use crate::scan::{self, SUCCESS_DIR};

/// Characters stripped from PDF file stems by [`normalize_pdf_filenames`].
const STRIPPED_CHARS: &[char] = &['(', ')', '[', ']', '【', '】', '。', '.'];

/// Options for [`convert_root`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    pub width: u32,
    pub jpeg_quality: u8,
    pub dpi: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            jpeg_quality: 85,
            dpi: 300,
        }
    }
}

impl ConvertOptions {
    fn pdf_options(&self) -> PdfOptions {
        PdfOptions {
            target_width: Some(self.width),
            jpeg_quality: self.jpeg_quality,
            dpi: self.dpi,
        }
    }
}

/// Strip whitespace and bracket/period characters from a file stem.
pub fn normalize_stem(stem: &str) -> String {
    stem.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Rename every `.pdf` in `dir` to its normalized name.
///
/// A rename that would overwrite an existing file is skipped. Returns the
/// `(old, new)` path of each file renamed.
pub fn normalize_pdf_filenames(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, StripcutError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StripcutError::io_at(dir, err)),
    };

    let mut renamed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StripcutError::io_at(dir, err))?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf || !path.is_file() {
            continue;
        }

        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        let normalized = format!("{}.{ext}", normalize_stem(stem));
        if normalized == entry.file_name().to_string_lossy() {
            continue;
        }

        let target = dir.join(&normalized);
        if target.exists() {
            warn!(
                "Not renaming {}: {} already exists",
                path.display(),
                target.display()
            );
            continue;
        }
        match fs::rename(&path, &target) {
            Ok(()) => {
                info!("Renamed {} -> {normalized}", path.display());
                renamed.push((path, target));
            }
            Err(err) => warn!("Unable to rename {}: {err}", path.display()),
        }
    }

    Ok(renamed)
}

fn convert_folder(
    folder: &Path,
    pdf_dir: &Path,
    options: &ConvertOptions,
    reporter: &dyn ProgressReporter,
) -> Result<ProjectOutcome, StripcutError> {
    let name = crate::pipeline::project_name(folder);
    let images = scan::list_images_in(folder)?;
    if images.is_empty() {
        return Ok(ProjectOutcome::new(name, ProjectStatus::NoImages));
    }

    let out_path = pdf_dir.join(format!("{name}.pdf"));
    let mut outcome = ProjectOutcome::new(name, ProjectStatus::Failed);
    outcome.source_images = images.len();

    match pdf::create_pdf_from_images(&images, &out_path, &options.pdf_options(), reporter)? {
        Some(summary) => {
            outcome.status = ProjectStatus::Succeeded;
            outcome.pages = summary.pages;
            outcome.pdf = Some(summary.path);
        }
        None => outcome.message = Some("no page could be encoded".into()),
    }
    Ok(outcome)
}

/// Convert every image folder under `root` into `<root-name>_pdfs/<folder>.pdf`.
///
/// Once every folder is converted, each successful one is moved into
/// `<root>/IMG`, except the root itself and folders already named `IMG`.
/// A nested folder travels with its moved parent. PDF names are
/// normalized at the end.
pub fn convert_root(
    root: &Path,
    options: &ConvertOptions,
    reporter: &dyn ProgressReporter,
) -> Result<BatchReport, StripcutError> {
    if !root.is_dir() {
        return Err(StripcutError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    if options.width == 0 || options.dpi == 0 {
        return Err(StripcutError::InvalidOption(
            "width and dpi must be greater than 0".into(),
        ));
    }

    let root = fs::canonicalize(root).map_err(|err| StripcutError::io_at(root, err))?;
    let pdf_dir_name = scan::pdf_dir_name(&root);
    let pdf_dir = root.join(&pdf_dir_name);
    let success_dir = root.join(SUCCESS_DIR);
    for dir in [&pdf_dir, &success_dir] {
        fs::create_dir_all(dir).map_err(|err| StripcutError::io_at(dir, err))?;
    }

    let mut report = BatchReport::new(root.clone(), pdf_dir.clone(), success_dir.clone());
    let folders = scan::find_image_folders(&root, &[SUCCESS_DIR, pdf_dir_name.as_str()])?;
    if folders.is_empty() {
        warn!("No image folders found in {}", root.display());
        return Ok(report);
    }
    reporter.on_batch_start(folders.len());

    // Every folder is converted before anything moves: moving a parent
    // carries its nested image folders along with it.
    for (idx, folder) in folders.iter().enumerate() {
        let name = crate::pipeline::project_name(folder);
        reporter.on_item_start(idx, folders.len(), &name);

        let outcome = match convert_folder(folder, &pdf_dir, options, reporter) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Converting {name} failed: {err}");
                ProjectOutcome::new(name.clone(), ProjectStatus::Failed)
                    .with_message(err.to_string())
            }
        };

        reporter.on_item_complete(&name, outcome.status.is_success());
        report.projects.push(outcome);
    }

    let mut moved: Vec<&Path> = Vec::new();
    for (folder, outcome) in folders.iter().zip(report.projects.iter_mut()) {
        if !outcome.status.is_success() || !should_move(folder, &root) {
            continue;
        }
        if moved.iter().any(|parent| folder.starts_with(parent)) {
            info!("{} was moved along with its parent", outcome.name);
            continue;
        }
        match crate::pipeline::move_into(folder, &success_dir) {
            Ok(_) => moved.push(folder),
            Err(err) => {
                error!("Failed to move {}: {err}", outcome.name);
                outcome.status = ProjectStatus::MoveFailed;
                outcome.message = Some(err.to_string());
            }
        }
    }

    for (old, new) in normalize_pdf_filenames(&pdf_dir)? {
        for outcome in &mut report.projects {
            if outcome.pdf.as_ref() == Some(&old) {
                outcome.pdf = Some(new.clone());
            }
        }
    }
    Ok(report)
}

fn should_move(folder: &Path, root: &Path) -> bool {
    folder != root && folder.file_name().is_some_and(|name| name != SUCCESS_DIR)
}

//! Discovery of images, project folders, and image folders on disk.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::StripcutError;
use crate::natsort;

/// Extensions (lowercase, without dot) accepted as source images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tiff", "tif"];

/// Folder holding the merged strip inside a project.
pub const MERGED_STRIP_DIR: &str = "merged_long_img";

/// Folder holding split segments and repacked bundles inside a project.
pub const SPLIT_DIR: &str = "split_by_solid_band";

/// Folder (under the root) that successful projects are moved into.
pub const SUCCESS_DIR: &str = "IMG";

/// Folders the pipeline creates inside a project; never scanned for input.
pub const INTERMEDIATE_DIRS: &[&str] = &[MERGED_STRIP_DIR, SPLIT_DIR];

/// Returns true if `path` has one of the accepted image extensions.
pub fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn entry_name(entry: &DirEntry) -> &str {
    entry.file_name().to_str().unwrap_or_default()
}

/// Name of the PDF output folder for a root, e.g. `comics_pdfs`.
pub fn pdf_dir_name(root: &Path) -> String {
    let base = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{base}_pdfs")
}

/// Recursively collect every image under `project_dir`, in natural order.
///
/// The pipeline's intermediate folders and hidden files are skipped.
pub fn collect_images(project_dir: &Path) -> Result<Vec<PathBuf>, StripcutError> {
    if !project_dir.is_dir() {
        return Err(StripcutError::NotADirectory {
            path: project_dir.to_path_buf(),
        });
    }

    let walker = WalkDir::new(project_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir() && INTERMEDIATE_DIRS.contains(&entry_name(entry)))
        });

    let mut images = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| StripcutError::Walk {
            path: project_dir.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file()
            && !is_hidden(entry_name(&entry))
            && is_image_file(entry.path())
        {
            images.push(entry.into_path());
        }
    }

    natsort::sort_paths(&mut images);
    Ok(images)
}

/// Images directly inside `dir` (no recursion), in natural order.
pub fn list_images_in(dir: &Path) -> Result<Vec<PathBuf>, StripcutError> {
    let entries = fs::read_dir(dir).map_err(|err| StripcutError::io_at(dir, err))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StripcutError::io_at(dir, err))?;
        let path = entry.path();
        let hidden = entry.file_name().to_str().map(is_hidden).unwrap_or(false);
        if !hidden && path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }

    natsort::sort_paths(&mut images);
    Ok(images)
}

/// Immediate subfolders of `root` that count as projects.
///
/// Hidden folders and any folder named in `excluded_names` are skipped.
pub fn discover_projects(
    root: &Path,
    excluded_names: &[&str],
) -> Result<Vec<PathBuf>, StripcutError> {
    let entries = fs::read_dir(root).map_err(|err| StripcutError::io_at(root, err))?;

    let mut projects = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StripcutError::io_at(root, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) || excluded_names.contains(&name.as_str()) {
            continue;
        }
        projects.push(path);
    }

    natsort::sort_paths(&mut projects);
    Ok(projects)
}

/// Every folder under `root` that directly contains at least one image.
///
/// Folders named in `excluded_names` are not descended into.
pub fn find_image_folders(
    root: &Path,
    excluded_names: &[&str],
) -> Result<Vec<PathBuf>, StripcutError> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir() && excluded_names.contains(&entry_name(entry)))
        });

    let mut folders = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| StripcutError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() && !list_images_in(entry.path())?.is_empty() {
            folders.push(entry.into_path());
        }
    }

    natsort::sort_paths(&mut folders);
    Ok(folders)
}

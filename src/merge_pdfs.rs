//! Merge the PDFs under each subfolder of a root into one PDF per subfolder.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::StripcutError;
use crate::{natsort, pdf};

/// Output folder created under the root.
pub const MERGED_PDF_DIR: &str = "merged_pdf";

/// One merged output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergedPdf {
    pub folder: String,
    pub inputs: usize,
    pub pages: usize,
    pub path: PathBuf,
}

/// Result of [`merge_pdf_tree`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct MergeSummary {
    pub output_dir: PathBuf,
    pub merged: Vec<MergedPdf>,
    /// Subfolders with no PDF, or whose PDFs held no readable page.
    pub skipped: Vec<String>,
}

impl std::fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Merged {} folder(s) into {}", self.merged.len(), self.output_dir.display())?;
        for merged in &self.merged {
            writeln!(
                f,
                "  {}: {} file(s), {} page(s)",
                merged.folder, merged.inputs, merged.pages
            )?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Every PDF under `dir`, recursively, in natural order.
pub fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>, StripcutError> {
    let mut pdfs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| StripcutError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_pdf(entry.path()) {
            pdfs.push(entry.into_path());
        }
    }
    natsort::sort_paths(&mut pdfs);
    Ok(pdfs)
}

/// For each immediate subfolder of `root`, merge all PDFs found beneath
/// it into `root/merged_pdf/<subfolder>.pdf`.
pub fn merge_pdf_tree(root: &Path) -> Result<MergeSummary, StripcutError> {
    if !root.is_dir() {
        return Err(StripcutError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let output_dir = root.join(MERGED_PDF_DIR);
    fs::create_dir_all(&output_dir).map_err(|err| StripcutError::io_at(&output_dir, err))?;

    let mut summary = MergeSummary {
        output_dir: output_dir.clone(),
        ..MergeSummary::default()
    };

    let mut subfolders = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| StripcutError::io_at(root, err))? {
        let entry = entry.map_err(|err| StripcutError::io_at(root, err))?;
        let path = entry.path();
        if path.is_dir() && entry.file_name() != MERGED_PDF_DIR {
            subfolders.push(path);
        }
    }
    natsort::sort_paths(&mut subfolders);

    if subfolders.is_empty() {
        warn!("No subfolders to merge under {}", root.display());
    }

    for folder in subfolders {
        let name = crate::pipeline::project_name(&folder);
        let inputs = collect_pdfs(&folder)?;
        if inputs.is_empty() {
            warn!("No PDFs in {name}; skipping");
            summary.skipped.push(name);
            continue;
        }

        info!("Merging {} PDF(s) from {name}", inputs.len());
        let out_path = output_dir.join(format!("{name}.pdf"));
        match pdf::merge_pdfs(&inputs, &out_path)? {
            Some(pages) => summary.merged.push(MergedPdf {
                folder: name,
                inputs: inputs.len(),
                pages,
                path: out_path,
            }),
            None => {
                warn!("Merge result for {name} is empty; no PDF written");
                summary.skipped.push(name);
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfOptions;
    use crate::progress::SilentReporter;
    use image::{Rgb, RgbImage};

    fn make_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
        let img = dir.join(format!("{name}.png"));
        RgbImage::from_pixel(10, 10, Rgb([50, 60, 70])).save(&img).unwrap();
        let out = dir.join(format!("{name}.pdf"));
        let images = vec![img.clone(); pages];
        pdf::create_pdf_from_images(&images, &out, &PdfOptions::default(), &SilentReporter)
            .unwrap();
        fs::remove_file(img).unwrap();
        out
    }

    #[test]
    fn merges_each_subfolder_recursively() {
        let root = tempfile::tempdir().unwrap();
        let series = root.path().join("series");
        let nested = series.join("vol2");
        fs::create_dir_all(&nested).unwrap();
        make_pdf(&series, "ch1", 2);
        make_pdf(&nested, "ch2", 1);
        fs::create_dir_all(root.path().join("empty")).unwrap();

        let summary = merge_pdf_tree(root.path()).unwrap();
        assert_eq!(summary.merged.len(), 1);
        assert_eq!(summary.merged[0].folder, "series");
        assert_eq!(summary.merged[0].inputs, 2);
        assert_eq!(summary.merged[0].pages, 3);
        assert!(root.path().join(MERGED_PDF_DIR).join("series.pdf").is_file());
        assert_eq!(summary.skipped, vec!["empty".to_string()]);
    }

    #[test]
    fn output_folder_is_not_an_input() {
        let root = tempfile::tempdir().unwrap();
        let series = root.path().join("a");
        fs::create_dir_all(&series).unwrap();
        make_pdf(&series, "x", 1);

        merge_pdf_tree(root.path()).unwrap();
        let again = merge_pdf_tree(root.path()).unwrap();
        assert_eq!(again.merged.len(), 1);
        assert_eq!(again.merged[0].pages, 1);
    }
}

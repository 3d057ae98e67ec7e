//! Splitting a merged strip at blank horizontal bands.
//!
//! Rows are first classified as blank or content (see [`classify`]), then
//! runs of blank rows tall enough to be a gutter become cut candidates.
//! Each cut sits at the midpoint of its band, so both neighbouring panels
//! keep half of the gutter as padding.

pub mod classify;
pub mod palette;

pub use classify::{HistogramClassifier, RowClassifier, SolidBandClassifier};

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops;
use image::{ImageFormat, RgbImage};
use tracing::{debug, info};

use crate::error::StripcutError;
use crate::progress::{ProgressReporter, Stage};
use crate::stitch;

/// Rules for turning blank-row flags into cut positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutPolicy {
    /// Minimum number of consecutive blank rows that form a band.
    pub min_band_height: u32,
    /// If true, a band touching the top of the strip is not cut.
    pub interior_only: bool,
    /// A trailing piece this short or shorter stays attached to the
    /// segment above it.
    pub min_tail_height: u32,
    /// Strips shorter than this are never split.
    pub min_strip_height: u32,
}

impl Default for CutPolicy {
    fn default() -> Self {
        Self {
            min_band_height: 50,
            interior_only: false,
            min_tail_height: 10,
            min_strip_height: 0,
        }
    }
}

/// A horizontal slice `[start, end)` of a strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
}

impl Segment {
    pub fn height(&self) -> u32 {
        self.end - self.start
    }
}

/// Find cut rows from per-row blank flags.
///
/// A band yields a cut only when a content row follows it; bands running
/// to the bottom of the strip are left alone. Cuts are strictly increasing
/// and never at row 0.
pub fn find_cuts(flags: &[bool], policy: &CutPolicy) -> Vec<u32> {
    let height = flags.len();
    if height < policy.min_strip_height as usize {
        return Vec::new();
    }

    let min_band = policy.min_band_height.max(1) as usize;
    let mut cuts: Vec<u32> = Vec::new();
    let mut last_cut = 0usize;
    let mut band_start: Option<usize> = None;

    for (y, &blank) in flags.iter().enumerate() {
        if blank {
            band_start.get_or_insert(y);
            continue;
        }

        let Some(start) = band_start.take() else {
            continue;
        };
        let band_height = y - start;
        if band_height < min_band || (policy.interior_only && start == 0) {
            continue;
        }

        let cut = start + band_height / 2;
        if cut > last_cut {
            cuts.push(cut as u32);
            last_cut = cut;
        }
    }

    while let Some(&last) = cuts.last() {
        if height - last as usize > policy.min_tail_height as usize {
            break;
        }
        cuts.pop();
    }

    cuts
}

/// Turn cut rows into contiguous segments covering `[0, height)`.
pub fn segments_from_cuts(height: u32, cuts: &[u32]) -> Vec<Segment> {
    if height == 0 {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &cut in cuts {
        if cut > start && cut < height {
            segments.push(Segment { start, end: cut });
            start = cut;
        }
    }
    segments.push(Segment { start, end: height });
    segments
}

/// Classify and cut an in-memory strip.
pub fn plan_segments(
    image: &RgbImage,
    classifier: &dyn RowClassifier,
    policy: &CutPolicy,
) -> Vec<Segment> {
    let flags = classifier.classify_rows(image);
    let cuts = find_cuts(&flags, policy);
    segments_from_cuts(image.height(), &cuts)
}

/// Result of splitting a strip on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Segment files, top to bottom.
    pub segments: Vec<PathBuf>,
    /// True if at least one cut was made.
    pub was_split: bool,
}

/// Split the strip at `strip_path` and save the segments into `out_dir`.
///
/// Segments are named `<strip-stem>_split_part_<n>.png`. When no band
/// qualifies, the strip itself is copied into `out_dir` as the only
/// segment.
pub fn split_strip(
    strip_path: &Path,
    out_dir: &Path,
    classifier: &dyn RowClassifier,
    policy: &CutPolicy,
    reporter: &dyn ProgressReporter,
) -> Result<SplitOutcome, StripcutError> {
    fs::create_dir_all(out_dir).map_err(|err| StripcutError::io_at(out_dir, err))?;

    let strip = stitch::open_rgb(strip_path)?;
    let started = std::time::Instant::now();
    let segments = plan_segments(&strip, classifier, policy);
    debug!(
        classifier = classifier.name(),
        rows = strip.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "row classification finished"
    );

    if segments.len() <= 1 {
        info!(
            "No qualifying blank band found by {}; keeping the strip whole",
            classifier.name()
        );
        let file_name = strip_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "strip.png".into());
        let dest = out_dir.join(file_name);
        fs::copy(strip_path, &dest).map_err(|err| StripcutError::io_at(&dest, err))?;
        return Ok(SplitOutcome {
            segments: vec![dest],
            was_split: false,
        });
    }

    let stem = strip_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "strip".to_string());

    reporter.on_stage_start(Stage::Split, segments.len());
    let mut paths = Vec::with_capacity(segments.len());
    for (idx, segment) in segments.iter().enumerate() {
        let piece =
            imageops::crop_imm(&strip, 0, segment.start, strip.width(), segment.height()).to_image();
        let path = out_dir.join(format!("{stem}_split_part_{}.png", idx + 1));
        piece
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| StripcutError::ImageSave {
                path: path.clone(),
                source,
            })?;
        debug!(y = segment.start, height = segment.height(), "saved {}", path.display());
        paths.push(path);
        reporter.on_stage_progress(Stage::Split, idx + 1);
    }
    reporter.on_stage_complete(Stage::Split);

    info!(
        "{} split the strip into {} segment(s)",
        classifier.name(),
        paths.len()
    );

    Ok(SplitOutcome {
        segments: paths,
        was_split: true,
    })
}

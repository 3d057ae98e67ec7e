//! Regrouping split segments into bundles under size and height ceilings.
//!
//! Splitting can leave many small segments; each becomes a PDF page. To
//! keep page count sensible, consecutive segments are concatenated back
//! together until adding one more would exceed either ceiling.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::error::StripcutError;
use crate::progress::{ProgressReporter, Stage};
use crate::stitch;

/// Size facts about one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Encoded file size in bytes.
    pub bytes: u64,
    /// Pixel height.
    pub height: u32,
}

/// Ceilings a bundle may not exceed unless it holds a single segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepackLimits {
    pub max_bytes: u64,
    pub max_height: u32,
}

impl RepackLimits {
    pub fn new(max_size_mb: u64, max_height: u32) -> Self {
        Self {
            max_bytes: max_size_mb.saturating_mul(1024 * 1024),
            max_height,
        }
    }
}

impl Default for RepackLimits {
    fn default() -> Self {
        Self::new(8, 30_000)
    }
}

/// Greedily group `items` into contiguous buckets.
///
/// An item joins the open bucket when the bucket is empty or when both
/// running totals stay within `limits`. An item that alone exceeds a
/// ceiling therefore always sits in a bucket of its own.
pub fn plan_buckets(items: &[SegmentInfo], limits: RepackLimits) -> Vec<Range<usize>> {
    let mut buckets = Vec::new();
    let mut start = 0;
    let mut bytes = 0u64;
    let mut height = 0u64;

    for (idx, item) in items.iter().enumerate() {
        let fits = bytes.saturating_add(item.bytes) <= limits.max_bytes
            && height + u64::from(item.height) <= u64::from(limits.max_height);
        if idx > start && !fits {
            buckets.push(start..idx);
            start = idx;
            bytes = 0;
            height = 0;
        }
        bytes = bytes.saturating_add(item.bytes);
        height += u64::from(item.height);
    }

    if start < items.len() {
        buckets.push(start..items.len());
    }
    buckets
}

fn segment_info(path: &Path) -> Result<SegmentInfo, StripcutError> {
    let bytes = fs::metadata(path)
        .map_err(|err| StripcutError::io_at(path, err))?
        .len();
    let size = imagesize::size(path).map_err(|source| StripcutError::ImageProbe {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SegmentInfo {
        bytes,
        height: u32::try_from(size.height).unwrap_or(u32::MAX),
    })
}

/// Repack the segment files at `paths` into `out_dir`.
///
/// Bundles are written as `<base_name>_repacked_<n>.png` in input order
/// and the original segment files are removed. With zero or one segment
/// the input is returned unchanged.
pub fn repack_segments(
    paths: &[PathBuf],
    out_dir: &Path,
    base_name: &str,
    limits: RepackLimits,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<PathBuf>, StripcutError> {
    if paths.len() <= 1 {
        debug!("Only {} segment(s); nothing to repack", paths.len());
        return Ok(paths.to_vec());
    }

    fs::create_dir_all(out_dir).map_err(|err| StripcutError::io_at(out_dir, err))?;

    let mut readable = Vec::with_capacity(paths.len());
    let mut infos = Vec::with_capacity(paths.len());
    for path in paths {
        match segment_info(path) {
            Ok(info) => {
                readable.push(path.clone());
                infos.push(info);
            }
            Err(err) => warn!("Skipping segment during repack: {err}"),
        }
    }

    let buckets = plan_buckets(&infos, limits);
    info!(
        "Repacking {} segment(s) into {} bundle(s) (limits: {} bytes, {}px)",
        readable.len(),
        buckets.len(),
        limits.max_bytes,
        limits.max_height
    );

    reporter.on_stage_start(Stage::Repack, buckets.len());
    let mut outputs = Vec::with_capacity(buckets.len());
    for (idx, bucket) in buckets.iter().enumerate() {
        let out_path = out_dir.join(format!("{base_name}_repacked_{}.png", idx + 1));
        let members = &readable[bucket.clone()];

        if let [single] = members {
            fs::copy(single, &out_path).map_err(|err| StripcutError::io_at(&out_path, err))?;
        } else {
            let images = members
                .iter()
                .map(|path| stitch::open_rgb(path))
                .collect::<Result<Vec<_>, _>>()?;
            let Some(bundle) = stitch::stack_vertically(&images) else {
                warn!("Bundle {} is empty; skipping", out_path.display());
                continue;
            };
            bundle
                .save_with_format(&out_path, ImageFormat::Png)
                .map_err(|source| StripcutError::ImageSave {
                    path: out_path.clone(),
                    source,
                })?;
        }

        debug!(members = members.len(), "wrote {}", out_path.display());
        outputs.push(out_path);
        reporter.on_stage_progress(Stage::Repack, idx + 1);
    }
    reporter.on_stage_complete(Stage::Repack);

    for path in paths {
        if outputs.contains(path) {
            continue;
        }
        if let Err(err) = fs::remove_file(path) {
            warn!("Unable to delete segment {}: {err}", path.display());
        }
    }

    Ok(outputs)
}

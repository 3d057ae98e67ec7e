//! Vertical stitching of page images into one long strip.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::{info, warn};

use crate::error::StripcutError;
use crate::progress::{ProgressReporter, SilentReporter, Stage};
use crate::scan;

/// Output folder used by [`stitch_folder`].
pub const STITCH_OUTPUT_DIR: &str = "merged_output";

/// File name used by [`stitch_folder`].
pub const STITCH_OUTPUT_FILE: &str = "stitched_long_image.png";

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// How the strip width is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidthMode {
    /// Canvas is as wide as the widest source; narrower images are centered.
    MaxWidth,
    /// Every source is resized to this width, keeping its aspect ratio.
    Fixed(u32),
}

/// A merged strip saved on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedStrip {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Number of sources that made it onto the canvas.
    pub source_count: usize,
}

#[derive(Debug)]
struct Placement {
    path: PathBuf,
    width: u32,
    height: u32,
}

/// Decode an image and flatten any alpha channel onto white.
///
/// Decoder memory limits are lifted: merged strips routinely exceed the
/// default allocation cap.
pub fn open_rgb(path: &Path) -> Result<RgbImage, StripcutError> {
    let mut reader = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|err| StripcutError::io_at(path, err))?;
    reader.no_limits();
    let image = reader.decode().map_err(|source| StripcutError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(flatten_onto_white(&image))
}

/// Convert to RGB, compositing transparent pixels over white.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = u32::from(src[3]);
        for channel in 0..3 {
            let value = u32::from(src[channel]);
            dst[channel] = ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }
    out
}

fn probe_dimensions(path: &Path) -> Result<(u32, u32), StripcutError> {
    let size = imagesize::size(path).map_err(|source| StripcutError::ImageProbe {
        path: path.to_path_buf(),
        source,
    })?;

    let width = u32::try_from(size.width).unwrap_or(0);
    let height = u32::try_from(size.height).unwrap_or(0);
    Ok((width, height))
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == target_width || width == 0 {
        return height;
    }
    let scaled = (u64::from(height) * u64::from(target_width)) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Stack the images at `paths` into one RGB canvas.
///
/// Images whose header cannot be read are skipped with a warning. Returns
/// `None` when nothing usable remains or the canvas would be empty.
pub fn merge_images(
    paths: &[PathBuf],
    mode: WidthMode,
    reporter: &dyn ProgressReporter,
) -> Result<Option<(RgbImage, usize)>, StripcutError> {
    reporter.on_stage_start(Stage::Merge, paths.len() * 2);

    let mut placements = Vec::with_capacity(paths.len());
    for (idx, path) in paths.iter().enumerate() {
        match probe_dimensions(path) {
            Ok((width, height)) if width > 0 && height > 0 => {
                let (width, height) = match mode {
                    WidthMode::MaxWidth => (width, height),
                    WidthMode::Fixed(target) => (target, scaled_height(width, height, target)),
                };
                placements.push(Placement {
                    path: path.clone(),
                    width,
                    height,
                });
            }
            Ok((width, height)) => {
                warn!("Skipping {}: zero-sized image ({width}x{height})", path.display());
            }
            Err(err) => warn!("Skipping image: {err}"),
        }
        reporter.on_stage_progress(Stage::Merge, idx + 1);
    }

    let canvas_width = placements.iter().map(|p| p.width).max().unwrap_or(0);
    let canvas_height: u64 = placements.iter().map(|p| u64::from(p.height)).sum();
    if placements.is_empty() || canvas_width == 0 || canvas_height == 0 {
        reporter.on_stage_complete(Stage::Merge);
        return Ok(None);
    }

    let canvas_height = u32::try_from(canvas_height).map_err(|_| {
        StripcutError::InvalidOption(format!(
            "merged strip would be {canvas_height}px tall, which exceeds the supported maximum"
        ))
    })?;

    let mut canvas = RgbImage::from_pixel(canvas_width, canvas_height, WHITE);
    let mut y_offset: u32 = 0;
    let mut pasted = 0;

    for (idx, placement) in placements.iter().enumerate() {
        match open_rgb(&placement.path) {
            Ok(source) => {
                let source = if source.width() != placement.width {
                    imageops::resize(&source, placement.width, placement.height, FilterType::Lanczos3)
                } else {
                    source
                };
                let x_offset = (canvas_width - source.width()) / 2;
                imageops::replace(&mut canvas, &source, i64::from(x_offset), i64::from(y_offset));
                pasted += 1;
            }
            // The probed height is still reserved, leaving a white gap.
            Err(err) => warn!("Failed to paste image: {err}"),
        }
        y_offset += placement.height;
        reporter.on_stage_progress(Stage::Merge, paths.len() + idx + 1);
    }

    reporter.on_stage_complete(Stage::Merge);

    if pasted == 0 {
        return Ok(None);
    }
    Ok(Some((canvas, pasted)))
}

/// Merge every image under `project_dir` into `out_dir/file_name` (PNG).
pub fn merge_to_long_image(
    project_dir: &Path,
    out_dir: &Path,
    file_name: &str,
    mode: WidthMode,
    reporter: &dyn ProgressReporter,
) -> Result<Option<MergedStrip>, StripcutError> {
    let images = scan::collect_images(project_dir)?;
    if images.is_empty() {
        info!("No images found in {}", project_dir.display());
        return Ok(None);
    }
    info!(
        "Merging {} image(s) from {}",
        images.len(),
        project_dir.display()
    );

    save_merged(&images, out_dir, file_name, mode, reporter)
}

fn save_merged(
    images: &[PathBuf],
    out_dir: &Path,
    file_name: &str,
    mode: WidthMode,
    reporter: &dyn ProgressReporter,
) -> Result<Option<MergedStrip>, StripcutError> {
    let Some((canvas, source_count)) = merge_images(images, mode, reporter)? else {
        warn!("No valid images available for merging");
        return Ok(None);
    };

    fs::create_dir_all(out_dir).map_err(|err| StripcutError::io_at(out_dir, err))?;
    let path = out_dir.join(file_name);
    canvas
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| StripcutError::ImageSave {
            path: path.clone(),
            source,
        })?;

    info!(
        "Merged strip {}x{} saved to {}",
        canvas.width(),
        canvas.height(),
        path.display()
    );

    Ok(Some(MergedStrip {
        path,
        width: canvas.width(),
        height: canvas.height(),
        source_count,
    }))
}

/// Stitch the images directly inside `dir` into
/// `dir/merged_output/stitched_long_image.png`.
pub fn stitch_folder(dir: &Path) -> Result<Option<MergedStrip>, StripcutError> {
    if !dir.is_dir() {
        return Err(StripcutError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let images = scan::list_images_in(dir)?;
    if images.is_empty() {
        info!("No supported images found in {}", dir.display());
        return Ok(None);
    }
    for image in &images {
        info!("  - {}", image.display());
    }

    save_merged(
        &images,
        &dir.join(STITCH_OUTPUT_DIR),
        STITCH_OUTPUT_FILE,
        WidthMode::MaxWidth,
        &SilentReporter,
    )
}

/// Concatenate already-decoded images top to bottom.
///
/// Width is the first image's width; wider rows are cropped and narrower
/// rows are padded with white on the right.
pub fn stack_vertically(images: &[RgbImage]) -> Option<RgbImage> {
    let width = images.first()?.width();
    let height: u32 = images.iter().map(RgbImage::height).sum();
    if width == 0 || height == 0 {
        return None;
    }

    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    let mut y_offset = 0i64;
    for image in images {
        imageops::replace(&mut canvas, image, 0, y_offset);
        y_offset += i64::from(image.height());
    }
    Some(canvas)
}

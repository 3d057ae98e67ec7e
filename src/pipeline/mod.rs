//! The per-project pipeline: merge, split, repack, and write a PDF.
//!
//! Splitting is heuristic, so a project is run through an ordered list of
//! [`SplitStrategy`] values. The first strategy that ends with a non-empty
//! PDF on disk wins; every failed attempt is cleaned up before the next
//! one starts.

mod batch;
mod report;

pub use batch::process_root;
pub use report::{BatchReport, ProjectOutcome, ProjectStatus, StrategyAttempt};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::StripcutError;
use crate::pdf::{self, PdfOptions, PdfSummary};
use crate::progress::ProgressReporter;
use crate::repack::{self, RepackLimits};
use crate::scan::{self, MERGED_STRIP_DIR, SPLIT_DIR};
use crate::split::palette::{Rgb8, WEBTOON_BACKGROUNDS};
use crate::split::{self, CutPolicy, HistogramClassifier, SolidBandClassifier};
use crate::stitch::{self, WidthMode};

/// Suffix of the merged strip file name, after the project name.
pub const STRIP_FILE_SUFFIX: &str = "stitched_long_strip.png";

/// One way of turning a merged strip into page segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStrategy {
    /// Cut at bands of near-uniform palette colour.
    SolidBand,
    /// Cut at bands with a small, consistent quantized histogram.
    Histogram,
    /// Keep the strip whole.
    Unsplit,
}

impl SplitStrategy {
    pub fn label(self) -> &'static str {
        match self {
            SplitStrategy::SolidBand => "solid-band",
            SplitStrategy::Histogram => "histogram",
            SplitStrategy::Unsplit => "unsplit",
        }
    }
}

impl std::fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Strategy selection exposed on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyChoice {
    /// Solid-band only, on a strip as wide as its widest source.
    SolidBand,
    /// Histogram only, on a fixed-width strip.
    Histogram,
    /// Solid-band, then histogram, then the unsplit strip.
    #[default]
    Hybrid,
}

impl StrategyChoice {
    /// Ordered strategies to try.
    pub fn plan(self) -> Vec<SplitStrategy> {
        match self {
            StrategyChoice::SolidBand => vec![SplitStrategy::SolidBand],
            StrategyChoice::Histogram => vec![SplitStrategy::Histogram],
            StrategyChoice::Hybrid => vec![
                SplitStrategy::SolidBand,
                SplitStrategy::Histogram,
                SplitStrategy::Unsplit,
            ],
        }
    }
}

/// Thresholds for the solid-band classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolidBandConfig {
    pub palette: Vec<Rgb8>,
    pub tolerance: u32,
    pub min_band_height: u32,
}

impl Default for SolidBandConfig {
    fn default() -> Self {
        Self {
            palette: WEBTOON_BACKGROUNDS.to_vec(),
            tolerance: 45,
            min_band_height: 50,
        }
    }
}

/// Thresholds for the histogram classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramConfig {
    pub quantization: u8,
    pub max_unique_colors: usize,
    pub min_band_height: u32,
    /// Fraction of the row width checked separately on each side.
    pub edge_margin: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            quantization: 32,
            max_unique_colors: 5,
            min_band_height: 30,
            edge_margin: 0.10,
        }
    }
}

/// Everything one batch run needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub strategy: StrategyChoice,
    pub solid_band: SolidBandConfig,
    pub histogram: HistogramConfig,
    pub limits: RepackLimits,
    /// Strip width for fixed-width strategies, and PDF downscale target.
    pub target_width: u32,
    pub jpeg_quality: u8,
    pub dpi: u32,
    /// Trailing segments this short stay attached to the one above.
    pub min_tail_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyChoice::default(),
            solid_band: SolidBandConfig::default(),
            histogram: HistogramConfig::default(),
            limits: RepackLimits::default(),
            target_width: 1500,
            jpeg_quality: 85,
            dpi: 300,
            min_tail_height: 10,
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make every project fail.
    pub fn validate(&self) -> Result<(), StripcutError> {
        if self.target_width == 0 {
            return Err(StripcutError::InvalidOption(
                "width must be greater than 0".into(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(StripcutError::InvalidOption(format!(
                "jpeg quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.dpi == 0 {
            return Err(StripcutError::InvalidOption("dpi must be greater than 0".into()));
        }
        if self.limits.max_bytes == 0 || self.limits.max_height == 0 {
            return Err(StripcutError::InvalidOption(
                "repack ceilings must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// How the merged strip width is chosen for this run.
    pub fn width_mode(&self) -> WidthMode {
        match self.strategy {
            StrategyChoice::SolidBand => WidthMode::MaxWidth,
            StrategyChoice::Histogram | StrategyChoice::Hybrid => {
                WidthMode::Fixed(self.target_width)
            }
        }
    }

    pub fn pdf_options(&self) -> PdfOptions {
        let target_width = match self.width_mode() {
            WidthMode::MaxWidth => None,
            WidthMode::Fixed(width) => Some(width),
        };
        PdfOptions {
            target_width,
            jpeg_quality: self.jpeg_quality,
            dpi: self.dpi,
        }
    }

    pub fn solid_band_policy(&self) -> CutPolicy {
        CutPolicy {
            min_band_height: self.solid_band.min_band_height,
            interior_only: false,
            min_tail_height: self.min_tail_height,
            min_strip_height: 0,
        }
    }

    pub fn histogram_policy(&self) -> CutPolicy {
        let band = self.histogram.min_band_height;
        CutPolicy {
            min_band_height: band,
            interior_only: true,
            min_tail_height: self.min_tail_height,
            min_strip_height: band.saturating_mul(3),
        }
    }
}

/// Outcome of [`run_strategies`].
#[derive(Clone, Debug, Default)]
pub struct StrategyRun {
    /// Every strategy tried, in order.
    pub attempts: Vec<StrategyAttempt>,
    /// The winning strategy and its PDF, if any.
    pub pdf: Option<(SplitStrategy, PdfSummary)>,
}

/// File and folder locations for one project's strategy loop.
#[derive(Clone, Debug)]
pub struct StrategyPaths<'a> {
    pub strip: &'a Path,
    pub split_dir: &'a Path,
    pub pdf: &'a Path,
    /// Prefix for repacked bundle file names.
    pub base_name: &'a str,
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

fn reset_dir(dir: &Path) -> Result<(), StripcutError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|err| StripcutError::io_at(dir, err))?;
    }
    fs::create_dir_all(dir).map_err(|err| StripcutError::io_at(dir, err))
}

fn discard_attempt(paths: &StrategyPaths<'_>) {
    if paths.split_dir.exists() {
        if let Err(err) = fs::remove_dir_all(paths.split_dir) {
            warn!("Unable to clear {}: {err}", paths.split_dir.display());
        }
    }
    if paths.pdf.exists() {
        if let Err(err) = fs::remove_file(paths.pdf) {
            warn!("Unable to delete partial PDF {}: {err}", paths.pdf.display());
        }
    }
}

fn attempt(
    strategy: SplitStrategy,
    paths: &StrategyPaths<'_>,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<(Option<PdfSummary>, usize), StripcutError> {
    reset_dir(paths.split_dir)?;

    let segments = match strategy {
        SplitStrategy::SolidBand => {
            let classifier =
                SolidBandClassifier::new(&config.solid_band.palette, config.solid_band.tolerance);
            split::split_strip(
                paths.strip,
                paths.split_dir,
                &classifier,
                &config.solid_band_policy(),
                reporter,
            )?
            .segments
        }
        SplitStrategy::Histogram => {
            let classifier = HistogramClassifier::new(
                config.histogram.quantization,
                config.histogram.max_unique_colors,
                config.histogram.edge_margin,
            );
            split::split_strip(
                paths.strip,
                paths.split_dir,
                &classifier,
                &config.histogram_policy(),
                reporter,
            )?
            .segments
        }
        SplitStrategy::Unsplit => {
            let name = paths
                .strip
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| STRIP_FILE_SUFFIX.into());
            let dest = paths.split_dir.join(name);
            fs::copy(paths.strip, &dest).map_err(|err| StripcutError::io_at(&dest, err))?;
            vec![dest]
        }
    };
    let segment_count = segments.len();

    let bundles = repack::repack_segments(
        &segments,
        paths.split_dir,
        paths.base_name,
        config.limits,
        reporter,
    )?;
    if bundles.is_empty() {
        return Ok((None, segment_count));
    }

    let summary = pdf::create_pdf_from_images(&bundles, paths.pdf, &config.pdf_options(), reporter)?;
    Ok((summary, segment_count))
}

/// Try each strategy in `plan` until one writes a non-empty PDF.
///
/// A failed attempt leaves nothing behind: its split folder and any
/// partial PDF are removed before the next strategy runs.
pub fn run_strategies(
    paths: &StrategyPaths<'_>,
    plan: &[SplitStrategy],
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> StrategyRun {
    let mut run = StrategyRun::default();

    for &strategy in plan {
        info!("Trying {strategy} strategy for {}", paths.base_name);
        let failure = match attempt(strategy, paths, config, reporter) {
            Ok((Some(summary), segments)) if is_non_empty_file(&summary.path) => {
                info!(
                    "{strategy} strategy produced {} page(s) from {segments} segment(s)",
                    summary.pages
                );
                run.attempts.push(StrategyAttempt {
                    strategy,
                    segments,
                    error: None,
                });
                run.pdf = Some((strategy, summary));
                return run;
            }
            Ok((_, segments)) => (segments, "no PDF was produced".to_string()),
            Err(err) => (0, err.to_string()),
        };

        warn!("{strategy} strategy failed: {}", failure.1);
        discard_attempt(paths);
        run.attempts.push(StrategyAttempt {
            strategy,
            segments: failure.0,
            error: Some(failure.1),
        });
    }

    run
}

fn remove_intermediates(project_dir: &Path) {
    for name in scan::INTERMEDIATE_DIRS {
        let dir = project_dir.join(name);
        if dir.is_dir() {
            if let Err(err) = fs::remove_dir_all(&dir) {
                warn!("Unable to delete {}: {err}", dir.display());
            }
        }
    }
}

/// Run the full pipeline for one project folder.
///
/// The PDF is written to `pdf_dir/<project>.pdf`. On success the
/// intermediate folders are removed; on failure they are kept for
/// inspection.
pub fn process_project(
    project_dir: &Path,
    pdf_dir: &Path,
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ProjectOutcome, StripcutError> {
    let name = project_name(project_dir);
    remove_intermediates(project_dir);

    let strip_dir = project_dir.join(MERGED_STRIP_DIR);
    let Some(strip) = stitch::merge_to_long_image(
        project_dir,
        &strip_dir,
        &format!("{name}_{STRIP_FILE_SUFFIX}"),
        config.width_mode(),
        reporter,
    )?
    else {
        return Ok(ProjectOutcome::new(name, ProjectStatus::NoImages)
            .with_message("no usable images to merge"));
    };

    let split_dir = project_dir.join(SPLIT_DIR);
    let pdf_path = pdf_dir.join(format!("{name}.pdf"));
    let paths = StrategyPaths {
        strip: &strip.path,
        split_dir: &split_dir,
        pdf: &pdf_path,
        base_name: &name,
    };

    let run = run_strategies(&paths, &config.strategy.plan(), config, reporter);
    let mut outcome = ProjectOutcome::new(name, ProjectStatus::Failed);
    outcome.source_images = strip.source_count;
    outcome.attempts = run.attempts;

    match run.pdf {
        Some((strategy, summary)) => {
            remove_intermediates(project_dir);
            outcome.status = ProjectStatus::Succeeded;
            outcome.strategy = Some(strategy);
            outcome.pages = summary.pages;
            outcome.pdf = Some(summary.path);
        }
        None => {
            outcome.message = Some("every strategy failed to produce a PDF".into());
        }
    }

    Ok(outcome)
}

pub(crate) fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

pub(crate) fn move_into(dir: &Path, dest_parent: &Path) -> Result<PathBuf, StripcutError> {
    let name = dir
        .file_name()
        .ok_or_else(|| StripcutError::NotADirectory {
            path: dir.to_path_buf(),
        })?;
    let dest = dest_parent.join(name);
    if dest.exists() {
        return Err(StripcutError::io_at(
            &dest,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    fs::rename(dir, &dest).map_err(|err| StripcutError::io_at(&dest, err))?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use image::{Rgb, RgbImage};

    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn plans_are_ordered() {
        assert_eq!(StrategyChoice::SolidBand.plan(), vec![SplitStrategy::SolidBand]);
        assert_eq!(StrategyChoice::Histogram.plan(), vec![SplitStrategy::Histogram]);
        assert_eq!(
            StrategyChoice::Hybrid.plan(),
            vec![
                SplitStrategy::SolidBand,
                SplitStrategy::Histogram,
                SplitStrategy::Unsplit
            ]
        );
    }

    #[test]
    fn defaults_match_hybrid_tuning() {
        let config = PipelineConfig::default();
        assert_eq!(config.strategy, StrategyChoice::Hybrid);
        assert_eq!(config.width_mode(), WidthMode::Fixed(1500));
        assert_eq!(config.limits.max_bytes, 8 * 1024 * 1024);
        assert_eq!(config.limits.max_height, 30_000);
        assert_eq!(config.histogram_policy().min_strip_height, 90);
        assert!(config.histogram_policy().interior_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn solid_band_choice_keeps_native_width() {
        let config = PipelineConfig {
            strategy: StrategyChoice::SolidBand,
            ..PipelineConfig::default()
        };
        assert_eq!(config.width_mode(), WidthMode::MaxWidth);
        assert_eq!(config.pdf_options().target_width, None);
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let config = PipelineConfig {
            jpeg_quality: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StripcutError::InvalidOption(_))
        ));
    }

    #[test]
    fn failed_attempt_falls_through_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let strip = dir.path().join("p_stitched_long_strip.png");
        // Not an image: every split attempt fails to decode it.
        fs::write(&strip, b"broken").unwrap();
        let split_dir = dir.path().join(SPLIT_DIR);
        let pdf_path = dir.path().join("out.pdf");

        let paths = StrategyPaths {
            strip: &strip,
            split_dir: &split_dir,
            pdf: &pdf_path,
            base_name: "p",
        };
        let run = run_strategies(
            &paths,
            &StrategyChoice::Hybrid.plan(),
            &PipelineConfig::default(),
            &SilentReporter,
        );

        assert!(run.pdf.is_none());
        assert_eq!(run.attempts.len(), 3);
        assert!(run.attempts.iter().all(|a| a.error.is_some()));
        assert!(!split_dir.exists());
        assert!(!pdf_path.exists());
    }

    #[test]
    fn first_successful_strategy_wins() {
        let dir = tempfile::tempdir().unwrap();
        let strip = dir.path().join("p_stitched_long_strip.png");
        textured(40, 120).save(&strip).unwrap();
        let split_dir = dir.path().join(SPLIT_DIR);
        let pdf_path = dir.path().join("pdfs").join("p.pdf");

        let paths = StrategyPaths {
            strip: &strip,
            split_dir: &split_dir,
            pdf: &pdf_path,
            base_name: "p",
        };
        let run = run_strategies(
            &paths,
            &StrategyChoice::Hybrid.plan(),
            &PipelineConfig::default(),
            &SilentReporter,
        );

        let (strategy, summary) = run.pdf.unwrap();
        assert_eq!(strategy, SplitStrategy::SolidBand);
        assert_eq!(summary.pages, 1);
        assert_eq!(run.attempts.len(), 1);
        assert!(pdf_path.is_file());
    }

    #[test]
    fn histogram_wins_after_solid_band_fails() {
        let dir = tempfile::tempdir().unwrap();
        let strip = dir.path().join("p_stitched_long_strip.png");
        // Magenta is far from every palette swatch, so only the histogram
        // classifier sees this band. Without a cut the strip is taller than
        // a page may be.
        RgbImage::from_fn(1500, 70_000, |x, y| {
            if (34_950..35_050).contains(&y) {
                Rgb([255, 0, 255])
            } else {
                Rgb([(x % 256) as u8, 40, 90])
            }
        })
        .save(&strip)
        .unwrap();
        let split_dir = dir.path().join(SPLIT_DIR);
        let pdf_path = dir.path().join("pdfs").join("p.pdf");

        let paths = StrategyPaths {
            strip: &strip,
            split_dir: &split_dir,
            pdf: &pdf_path,
            base_name: "p",
        };
        let run = run_strategies(
            &paths,
            &StrategyChoice::Hybrid.plan(),
            &PipelineConfig::default(),
            &SilentReporter,
        );

        assert_eq!(run.attempts.len(), 2);
        assert_eq!(run.attempts[0].strategy, SplitStrategy::SolidBand);
        assert!(run.attempts[0].error.is_some());
        assert_eq!(run.attempts[1].segments, 2);

        let (strategy, summary) = run.pdf.unwrap();
        assert_eq!(strategy, SplitStrategy::Histogram);
        assert_eq!(summary.pages, 2);

        let mut left: Vec<String> = fs::read_dir(&split_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["p_repacked_1.png", "p_repacked_2.png"]);
    }

    #[test]
    fn process_project_cleans_intermediates_on_success() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("ch1");
        fs::create_dir(&project).unwrap();
        textured(60, 80).save(project.join("1.png")).unwrap();
        textured(60, 80).save(project.join("2.png")).unwrap();
        let pdf_dir = root.path().join("pdfs");

        let outcome = process_project(
            &project,
            &pdf_dir,
            &PipelineConfig::default(),
            &SilentReporter,
        )
        .unwrap();

        assert_eq!(outcome.status, ProjectStatus::Succeeded);
        assert_eq!(outcome.source_images, 2);
        assert_eq!(outcome.pdf, Some(pdf_dir.join("ch1.pdf")));
        assert!(!project.join(MERGED_STRIP_DIR).exists());
        assert!(!project.join(SPLIT_DIR).exists());
    }

    #[test]
    fn empty_project_reports_no_images() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("empty");
        fs::create_dir(&project).unwrap();

        let outcome = process_project(
            &project,
            &root.path().join("pdfs"),
            &PipelineConfig::default(),
            &SilentReporter,
        )
        .unwrap();
        assert_eq!(outcome.status, ProjectStatus::NoImages);
        assert!(outcome.pdf.is_none());
    }
}

//! Stripcut: split webtoon long strips into page-sized PDFs.
//!
//! Each project folder of page images is merged into one tall strip, cut
//! at blank horizontal bands between panels, regrouped into bundles under
//! byte and height ceilings, and written out as a PDF with one page per
//! bundle.
//!
//! # Modules
//!
//! - [`stitch`]: merging images into a strip
//! - [`split`]: row classification and cut selection
//! - [`repack`]: bundling segments under size ceilings
//! - [`pdf`]: PDF assembly and concatenation
//! - [`pipeline`]: per-project strategy loop and batch processing
//! - [`convert`]: folder-to-PDF quick convert
//! - [`merge_pdfs`]: merging PDFs per subfolder
//! - [`settings`]: the persisted settings file
//! - [`error`]: error types

pub mod convert;
pub mod error;
pub mod logging;
pub mod merge_pdfs;
pub mod natsort;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod repack;
pub mod scan;
pub mod settings;
pub mod split;
pub mod stitch;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

pub use error::StripcutError;

use pipeline::{PipelineConfig, StrategyChoice};
use progress::{CliReporter, ProgressReporter};
use repack::RepackLimits;
use settings::Settings;

/// The stripcut CLI application.
#[derive(Parser)]
#[command(name = "stripcut")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to $STRIPCUT_SETTINGS, then shared_assets/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// More log output (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors and hide progress bars.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Merge, split, repack and convert every project folder to PDF.
    Run(RunArgs),
    /// Convert each image folder to a PDF without splitting.
    Convert(ConvertArgs),
    /// Stitch the images in one folder into a single long image.
    Stitch(StitchArgs),
    /// Merge the PDFs under each subfolder into one PDF per subfolder.
    MergePdfs(MergePdfsArgs),
    /// Show or edit the settings file.
    Config(ConfigArgs),
}

/// Report format for batch commands.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the run subcommand.
#[derive(clap::Args)]
struct RunArgs {
    /// Root folder containing one subfolder per project.
    root: Option<PathBuf>,

    /// Split strategy.
    #[arg(long, value_enum, default_value_t = StrategyChoice::Hybrid)]
    strategy: StrategyChoice,

    /// Maximum size of a repacked bundle, in MB.
    #[arg(long, default_value_t = 8)]
    max_size_mb: u64,

    /// Maximum height of a repacked bundle, in pixels.
    #[arg(long, default_value_t = 30_000)]
    max_height: u32,

    /// Strip width for fixed-width strategies.
    #[arg(long, default_value_t = 1500)]
    width: u32,

    /// JPEG quality of PDF pages (1-100).
    #[arg(long, default_value_t = 85)]
    jpeg_quality: u8,

    /// PDF resolution.
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Output format for the summary report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Exit non-zero if any project failed.
    #[arg(long)]
    strict: bool,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Root folder to search for image folders.
    root: Option<PathBuf>,

    /// Pages wider than this are downscaled.
    #[arg(long, default_value_t = 1600)]
    width: u32,

    /// PDF resolution.
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Output format for the summary report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Exit non-zero if any folder failed.
    #[arg(long)]
    strict: bool,
}

/// Arguments for the stitch subcommand.
#[derive(clap::Args)]
struct StitchArgs {
    /// Folder whose images are stitched.
    dir: PathBuf,
}

/// Arguments for the merge-pdfs subcommand.
#[derive(clap::Args)]
struct MergePdfsArgs {
    /// Root folder whose subfolders hold PDFs.
    root: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings (API key masked).
    Show,
    /// Set the default work directory.
    SetWorkDir {
        /// Existing directory to use when no root is given.
        path: PathBuf,
    },
}

/// Run the stripcut CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), StripcutError> {
    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        -1
    } else {
        i8::try_from(cli.verbose).unwrap_or(i8::MAX)
    };
    logging::init(verbosity);

    let settings_path = settings::resolve_settings_path(cli.settings.as_deref());
    let reporter = if cli.quiet {
        CliReporter::hidden()
    } else {
        CliReporter::new()
    };

    match cli.command {
        Some(Commands::Run(args)) => run_pipeline(args, &settings_path, &reporter),
        Some(Commands::Convert(args)) => run_convert(args, &settings_path, &reporter),
        Some(Commands::Stitch(args)) => run_stitch(args),
        Some(Commands::MergePdfs(args)) => run_merge_pdfs(args, &settings_path),
        Some(Commands::Config(args)) => run_config(args, &settings_path),
        None => {
            // No subcommand: print a short usage hint
            println!("stripcut {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Split webtoon long strips into page-sized PDFs.");
            println!();
            println!("Run 'stripcut --help' for usage information.");
            Ok(())
        }
    }
}

/// Pick the root folder: the argument if given, else the settings' work dir.
fn resolve_root(arg: Option<PathBuf>, settings_path: &Path) -> Result<PathBuf, StripcutError> {
    let root = match arg {
        Some(root) => root,
        None => {
            let dir = Settings::load(settings_path)?.work_dir();
            tracing::info!("Using default work directory {}", dir.display());
            dir
        }
    };

    if !root.is_dir() {
        return Err(StripcutError::NotADirectory { path: root });
    }
    Ok(root)
}

fn print_report(report: &pipeline::BatchReport, format: OutputFormat) -> Result<(), StripcutError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(StripcutError::ReportJson)?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

fn finish_batch(report: pipeline::BatchReport, strict: bool) -> Result<(), StripcutError> {
    if strict && !report.is_ok() {
        Err(StripcutError::BatchFailed {
            failed: report.failed(),
            total: report.total(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the run subcommand.
fn run_pipeline(
    args: RunArgs,
    settings_path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<(), StripcutError> {
    let root = resolve_root(args.root, settings_path)?;

    let config = PipelineConfig {
        strategy: args.strategy,
        limits: RepackLimits::new(args.max_size_mb, args.max_height),
        target_width: args.width,
        jpeg_quality: args.jpeg_quality,
        dpi: args.dpi,
        ..PipelineConfig::default()
    };

    let report = pipeline::process_root(&root, &config, reporter)?;
    print_report(&report, args.output)?;
    finish_batch(report, args.strict)
}

/// Execute the convert subcommand.
fn run_convert(
    args: ConvertArgs,
    settings_path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<(), StripcutError> {
    let root = resolve_root(args.root, settings_path)?;
    let options = convert::ConvertOptions {
        width: args.width,
        dpi: args.dpi,
        ..convert::ConvertOptions::default()
    };

    let report = convert::convert_root(&root, &options, reporter)?;
    print_report(&report, args.output)?;
    finish_batch(report, args.strict)
}

/// Execute the stitch subcommand.
fn run_stitch(args: StitchArgs) -> Result<(), StripcutError> {
    match stitch::stitch_folder(&args.dir)? {
        Some(strip) => {
            println!(
                "Stitched {} image(s) into {} ({}x{})",
                strip.source_count,
                strip.path.display(),
                strip.width,
                strip.height
            );
        }
        None => println!("No images to stitch in {}", args.dir.display()),
    }
    Ok(())
}

/// Execute the merge-pdfs subcommand.
fn run_merge_pdfs(args: MergePdfsArgs, settings_path: &Path) -> Result<(), StripcutError> {
    let root = resolve_root(args.root, settings_path)?;
    let summary = merge_pdfs::merge_pdf_tree(&root)?;
    print!("{summary}");
    Ok(())
}

/// Execute the config subcommand.
fn run_config(args: ConfigArgs, settings_path: &Path) -> Result<(), StripcutError> {
    match args.action {
        ConfigAction::Show => {
            let settings = Settings::load(settings_path)?;
            println!("# {}", settings_path.display());
            print!("{settings}");
        }
        ConfigAction::SetWorkDir { path } => {
            if !path.is_dir() {
                return Err(StripcutError::NotADirectory { path });
            }
            let path = std::fs::canonicalize(&path).map_err(|err| StripcutError::io_at(&path, err))?;
            let mut settings = Settings::load(settings_path)?;
            settings.default_work_dir = path.display().to_string();
            settings.save(settings_path)?;
            println!("default_work_dir set to {}", settings.default_work_dir);
        }
    }
    Ok(())
}

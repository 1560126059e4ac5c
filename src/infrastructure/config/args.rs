use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "mdpreview",
    version,
    about = "Reconcile inline image previews for a markdown document",
    long_about = None
)]
pub struct CliArgs {
    /// Markdown file to preview.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Width of the editing surface in pixels.
    #[arg(long, default_value_t = 800)]
    pub viewport_width: u32,

    /// Print the pass report as JSON instead of the document.
    #[arg(long)]
    pub json: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Show inline image previews.
    #[arg(long)]
    pub enable_preview: Option<bool>,

    /// Shrink previews to fit the viewport.
    #[arg(long)]
    pub constrain_preview_width: Option<bool>,

    /// Remote fetch timeout in seconds.
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// Maximum decoded images kept in memory.
    #[arg(long)]
    pub cache_capacity: Option<usize>,
}

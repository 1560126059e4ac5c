//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::entities::{DEFAULT_MIN_PREVIEW_WIDTH, DEFAULT_WIDTH_MARGIN, PreviewSettings};
use crate::infrastructure::image::HttpFetcherConfig;

use super::args::CliArgs;

pub(super) const APP_NAME: &str = "mdpreview";
pub(super) const APP_QUALIFIER: &str = "org";
pub(super) const APP_ORGANIZATION: &str = "mdpreview";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Preview behavior.
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Remote fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Decoded image cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Preview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Show inline image previews.
    #[serde(default = "default_true")]
    pub enable_preview: bool,

    /// Shrink previews to fit the editor width.
    #[serde(default = "default_true")]
    pub constrain_preview_width: bool,

    /// Pixels kept free beside a constrained preview.
    #[serde(default = "default_width_margin")]
    pub width_margin: u32,

    /// Lower bound for the width available to a constrained preview.
    #[serde(default = "default_min_preview_width")]
    pub min_preview_width: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enable_preview: true,
            constrain_preview_width: true,
            width_margin: DEFAULT_WIDTH_MARGIN,
            min_preview_width: DEFAULT_MIN_PREVIEW_WIDTH,
        }
    }
}

/// Remote fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

impl From<&FetchConfig> for HttpFetcherConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_concurrent_downloads: config.max_concurrent_downloads,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Decoded image cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum decoded images kept. Unset keeps every image for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_width_margin() -> u32 {
    DEFAULT_WIDTH_MARGIN
}

fn default_min_preview_width() -> u32 {
    DEFAULT_MIN_PREVIEW_WIDTH
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_downloads() -> usize {
    4
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(enable_preview) = args.enable_preview {
            self.preview.enable_preview = enable_preview;
        }
        if let Some(constrain) = args.constrain_preview_width {
            self.preview.constrain_preview_width = constrain;
        }
        if let Some(timeout_secs) = args.fetch_timeout {
            self.fetch.timeout_secs = timeout_secs;
        }
        if let Some(capacity) = args.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
    }

    /// Settings snapshot handed to the engine.
    #[must_use]
    pub const fn preview_settings(&self) -> PreviewSettings {
        PreviewSettings {
            enable_preview: self.preview.enable_preview,
            constrain_width: self.preview.constrain_preview_width,
            width_margin: self.preview.width_margin,
            min_width: self.preview.min_preview_width,
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("mdpreview.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            preview: PreviewConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

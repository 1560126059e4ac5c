//! Application configuration.

pub mod app_config;
pub mod args;
pub mod shared_settings;
pub mod storage;

pub use app_config::{AppConfig, CacheConfig, FetchConfig, LogLevel, PreviewConfig};
pub use args::CliArgs;
pub use shared_settings::SharedPreviewSettings;
pub use storage::{ConfigError, StorageManager};

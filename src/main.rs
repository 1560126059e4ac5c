use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mdpreview::application::PreviewReconciler;
use mdpreview::domain::PreviewDocument;
use mdpreview::domain::entities::{PLACEHOLDER_MARKER, SyncReport};
use mdpreview::infrastructure::{
    AppConfig, CliArgs, FsLinkResolver, HttpFetcherConfig, HttpImageFetcher, ImageFetchedEvent,
    RegionExtractor, SharedPreviewSettings, StorageManager, TextDocument,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new().wrap_err("Failed to locate configuration directory")?;
    let mut config = storage
        .load_config(args.config.as_deref())
        .wrap_err("Failed to load configuration")?;
    config.merge_with_args(args);
    Ok(config)
}

/// Waits for in-flight downloads, feeding each result to the engine.
async fn drain_fetches(
    engine: &mut PreviewReconciler,
    events: &mut mpsc::UnboundedReceiver<ImageFetchedEvent>,
    timeout: Duration,
) -> usize {
    let mut arrived = 0;
    while engine.pending_fetches() > 0 {
        match tokio::time::timeout(timeout, events.recv()).await {
            Ok(Some(event)) => {
                if engine.on_image_fetched(event) {
                    arrived += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(pending = engine.pending_fetches(), "Gave up waiting for downloads");
                break;
            }
        }
    }
    arrived
}

/// Replaces each placeholder marker with a readable tag.
fn render(doc: &TextDocument) -> String {
    let text = doc.to_string();
    let mut out = String::with_capacity(text.len());
    for (offset, c) in text.chars().enumerate() {
        match doc.marker_at(offset) {
            Some(format) if c == PLACEHOLDER_MARKER => {
                let _ = write!(
                    out,
                    "[preview {} {}px {}]",
                    format.preview_id, format.width, format.resolved_path
                );
            }
            _ => out.push(c),
        }
    }
    out
}

fn print_report(report: &SyncReport, doc: &TextDocument, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render(doc));
        for skipped in &report.skipped {
            eprintln!(
                "skipped {}..{}: {}",
                skipped.region.start, skipped.region.end, skipped.error
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = mdpreview::VERSION, file = %args.file.display(), "Starting mdpreview");

    let source = tokio::fs::read_to_string(&args.file)
        .await
        .wrap_err_with(|| format!("Failed to read {}", args.file.display()))?;
    let mut doc = TextDocument::new(&source, args.viewport_width);
    doc.set_modified(false);

    let base_dir = args
        .file
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_default();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let fetcher = HttpImageFetcher::new(HttpFetcherConfig::from(&config.fetch), &event_tx)?;
    let settings = SharedPreviewSettings::new(config.preview_settings());

    let mut engine = PreviewReconciler::new(
        Arc::new(FsLinkResolver::new(base_dir)),
        Arc::new(fetcher),
        Arc::new(settings),
        config.cache.capacity,
    );

    let regions = RegionExtractor::extract(&doc.to_string());
    let mut report = engine.synchronize(&mut doc, &regions);
    debug!(?report, "Initial pass");

    if engine.pending_fetches() > 0 {
        let timeout = Duration::from_secs(config.fetch.timeout_secs + 1);
        let arrived = drain_fetches(&mut engine, &mut event_rx, timeout).await;
        if arrived > 0 {
            let regions = RegionExtractor::extract(&doc.to_string());
            report = engine.update(&mut doc, &regions);
        }
    }

    info!(
        previews = engine.preview_count(),
        stats = %engine.cache().stats(),
        "Done"
    );
    print_report(&report, &doc, args.json)
}

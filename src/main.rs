//! flickrdl-rs: download a Flickr account's photos, whole or album by
//! album, and embed each photo's title, description and tags with exiftool.
//!
//! Listing goes through the Flickr REST API with bounded retries and a
//! guard against the search index's ~4000 result ceiling. Downloads run one
//! photo at a time in discovery order and can be interrupted between photos.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
mod error;
mod fetch;
mod flickr;
mod progress;
pub mod retry;
mod run;
mod shutdown;
mod types;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use cli::Command;
use config::{Account, Config, DownloadSettings};
use download::exiftool::ExifTool;
use flickr::FlickrClient;
use progress::{ProgressReporter, ProgressUpdate};
use run::RunRequest;

/// Resolve the account id, looking the username up if that is what we got.
async fn resolve_user_id(flickr: &FlickrClient, config: &Config) -> anyhow::Result<String> {
    match &config.account {
        Account::UserId(id) => Ok(id.clone()),
        Account::Username(name) => {
            // An unknown name is answered with `stat: fail`; asking again won't help.
            let classify = |e: &flickr::RemoteError| {
                if e.is_service() {
                    retry::RetryAction::Abort
                } else {
                    retry::RetryAction::Retry
                }
            };
            let id = retry::retry_with_backoff(&config.retry, classify, || {
                flickr.find_user_id(name)
            })
            .await
            .with_context(|| format!("Could not look up Flickr user '{name}'"))?;
            tracing::info!(username = %name, user_id = %id, "Resolved account");
            Ok(id)
        }
    }
}

/// Run the albums command.
async fn run_albums(flickr: &FlickrClient, user_id: &str, config: &Config) -> anyhow::Result<()> {
    let token = shutdown::install_signal_handler();
    let albums = fetch::discover_collections(
        flickr,
        user_id,
        config.page_size,
        &config.retry,
        &token,
        &ProgressReporter::disabled(),
    )
    .await?;

    if albums.is_empty() {
        println!("No albums found.");
        return Ok(());
    }
    println!("Albums:");
    for album in &albums {
        println!(
            "  {} ({} photos) [{}]",
            album.title, album.item_count, album.id
        );
    }
    Ok(())
}

/// Create a percentage progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY (e.g. piped output, cron jobs).
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(100);
    match ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => tracing::debug!("Progress template rejected: {e}"),
    }
    pb
}

/// Drain progress updates into the bar until the pipeline drops its sender.
async fn show_progress(mut rx: mpsc::UnboundedReceiver<ProgressUpdate>, pb: ProgressBar) {
    let mut last_status = String::new();
    while let Some(update) = rx.recv().await {
        pb.set_position(update.percent.into());
        if update.status != last_status {
            pb.suspend(|| tracing::debug!(percent = update.percent, "{}", update.status));
            pb.set_message(update.status.clone());
            last_status = update.status;
        }
    }
}

/// Run the download command.
async fn run_download(
    flickr: FlickrClient,
    http: Client,
    user_id: String,
    config: &Config,
    settings: DownloadSettings,
) -> anyhow::Result<()> {
    let embedder = match settings.exiftool.clone() {
        Some(path) => ExifTool::new(path),
        None => ExifTool::locate()
            .context("exiftool not found on PATH; install it or pass --exiftool")?,
    }
    .with_timeout(settings.exiftool_timeout);
    tracing::debug!(exiftool = %embedder.binary().display(), "Using metadata tool");

    let request = RunRequest {
        user_id,
        selection: settings.selection,
        date_range: settings.date_range,
        fetch: fetch::FetchConfig {
            page_size: config.page_size,
            retry: config.retry,
            ceiling: fetch::RESULT_CEILING,
            guard_collections: settings.strict_album_limit,
        },
        download: download::DownloadConfig {
            directory: settings.directory,
            retry: config.retry,
        },
    };
    tracing::info!(
        selection = ?request.selection,
        directory = %request.download.directory.display(),
        "Starting flickrdl-rs"
    );

    let token = shutdown::install_signal_handler();
    let (reporter, rx) = ProgressReporter::channel();
    let pb = create_progress_bar(settings.no_progress_bar);
    let display = tokio::spawn(show_progress(rx, pb.clone()));

    let worker = tokio::spawn(async move {
        run::run(&flickr, &http, &embedder, &request, &token, &reporter).await
    });
    let outcome = worker.await.context("Download task panicked")?;
    let _ = display.await;
    pb.finish_and_clear();

    match outcome.user_message() {
        Some(message) if outcome.is_success() => {
            println!("{message}");
            Ok(())
        }
        Some(message) => anyhow::bail!("{message}"),
        None => {
            tracing::info!("Cancelled, photos already downloaded were kept");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli.account)?;
    tracing::debug!(?config, "Configuration");

    let http = Client::builder()
        .user_agent(concat!("flickrdl-rs/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let flickr = FlickrClient::new(http.clone(), config.api_key.clone());
    let user_id = resolve_user_id(&flickr, &config).await?;

    match cli.command {
        Command::Albums => run_albums(&flickr, &user_id, &config).await,
        Command::Download(args) => {
            let settings = DownloadSettings::from_cli(args)?;
            run_download(flickr, http, user_id, &config, settings).await
        }
    }
}

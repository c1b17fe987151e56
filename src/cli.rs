use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "flickrdl-rs",
    version,
    about = "Download Flickr photos with their titles, descriptions and tags"
)]
pub struct Cli {
    #[command(flatten)]
    pub account: AccountArgs,

    /// Log level (RUST_LOG overrides this)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the account's albums
    Albums,
    /// Download photos and embed their metadata
    Download(DownloadArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AccountArgs {
    /// Flickr API key.
    /// Prefer the FLICKR_API_KEY environment variable; arguments are
    /// visible in process listings.
    #[arg(long, env = "FLICKR_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Account id (NSID), e.g. 12037949754@N01
    #[arg(long, global = true)]
    pub user_id: Option<String>,

    /// Account screen name, resolved to an id before anything else
    #[arg(short = 'u', long, global = true)]
    pub username: Option<String>,

    /// Attempts per remote call and per transfer, including the first
    #[arg(long, default_value_t = 3, global = true)]
    pub max_tries: u32,

    /// Base delay in seconds between attempts (exponential backoff with jitter, 0 disables)
    #[arg(long, default_value_t = 1, global = true)]
    pub retry_delay: u64,

    /// Items requested per page
    #[arg(long, default_value_t = 500, global = true)]
    pub page_size: u32,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Local directory for downloads
    #[arg(short = 'd', long)]
    pub directory: String,

    /// Download every photo of the account into the directory
    #[arg(long, conflicts_with_all = ["albums", "every_album"])]
    pub all_photos: bool,

    /// Album(s) to download, each into its own subfolder
    #[arg(short = 'a', long = "album")]
    pub albums: Vec<String>,

    /// Download every album, each into its own subfolder
    #[arg(long, conflicts_with = "albums")]
    pub every_album: bool,

    /// With --all-photos, skip photos taken before this ISO date or interval (e.g., 2025-01-02 or 20d)
    #[arg(long)]
    pub start_date: Option<String>,

    /// With --all-photos, skip photos taken after this ISO date or interval
    #[arg(long)]
    pub stop_date: Option<String>,

    /// Path to exiftool (default: found on PATH)
    #[arg(long)]
    pub exiftool: Option<String>,

    /// Kill exiftool and fail the run if one invocation takes longer than this many seconds
    #[arg(long)]
    pub exiftool_timeout: Option<u64>,

    /// Also reject albums whose listing reports more photos than Flickr returns accurately
    #[arg(long)]
    pub strict_album_limit: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}

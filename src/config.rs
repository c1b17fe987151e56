use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::cli::{AccountArgs, DownloadArgs};
use crate::flickr::DateRange;
use crate::retry::RetryConfig;
use crate::run::Selection;

/// Flickr's upper bound for `per_page`.
const MAX_PAGE_SIZE: u32 = 500;

/// Cap on the exponential backoff between attempts.
const MAX_RETRY_DELAY_SECS: u64 = 30;

/// How the account is named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Account {
    UserId(String),
    Username(String),
}

/// Settings shared by every subcommand.
pub struct Config {
    pub api_key: String,
    pub account: Account,
    pub page_size: u32,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("account", &self.account)
            .field("page_size", &self.page_size)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Settings of the `download` subcommand.
#[derive(Debug)]
pub struct DownloadSettings {
    pub directory: PathBuf,
    pub selection: Selection,
    pub date_range: Option<DateRange>,
    pub exiftool: Option<PathBuf>,
    pub exiftool_timeout: Option<Duration>,
    pub strict_album_limit: bool,
    pub no_progress_bar: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: &AccountArgs) -> anyhow::Result<Self> {
        let api_key = match cli.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => bail!("An API key is required (--api-key or FLICKR_API_KEY)"),
        };

        let account = match (&cli.user_id, &cli.username) {
            (Some(_), Some(_)) => bail!("Give either --user-id or --username, not both"),
            (Some(id), None) => Account::UserId(id.clone()),
            (None, Some(name)) => Account::Username(name.clone()),
            (None, None) => bail!("An account is required (--user-id or --username)"),
        };

        if cli.max_tries == 0 {
            bail!("--max-tries must be at least 1");
        }
        if cli.page_size == 0 || cli.page_size > MAX_PAGE_SIZE {
            bail!("--page-size must be between 1 and {MAX_PAGE_SIZE}");
        }

        Ok(Self {
            api_key,
            account,
            page_size: cli.page_size,
            retry: RetryConfig {
                max_attempts: cli.max_tries,
                base_delay_secs: cli.retry_delay,
                max_delay_secs: MAX_RETRY_DELAY_SECS.max(cli.retry_delay),
            },
        })
    }
}

impl DownloadSettings {
    pub fn from_cli(cli: DownloadArgs) -> anyhow::Result<Self> {
        let selection = if cli.all_photos {
            Selection::AllItems
        } else if !cli.albums.is_empty() {
            Selection::Albums(cli.albums)
        } else if cli.every_album {
            Selection::EveryAlbum
        } else {
            bail!("Choose what to download: --all-photos, --album TITLE or --every-album");
        };

        let start = cli
            .start_date
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()
            .context("Invalid --start-date")?;
        let stop = cli
            .stop_date
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()
            .context("Invalid --stop-date")?;
        let date_range = date_range(start, stop)?;
        if date_range.is_some() && selection != Selection::AllItems {
            bail!(
                "--start-date and --stop-date only apply with --all-photos; \
                 albums are downloaded whole"
            );
        }
        if cli.exiftool_timeout == Some(0) {
            bail!("--exiftool-timeout must be at least 1 second");
        }

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            selection,
            date_range,
            exiftool: cli.exiftool.as_deref().map(expand_tilde),
            exiftool_timeout: cli.exiftool_timeout.map(Duration::from_secs),
            strict_album_limit: cli.strict_album_limit,
            no_progress_bar: cli.no_progress_bar,
        })
    }
}

/// Inclusive capture-date window. A missing end is left open.
fn date_range(
    start: Option<NaiveDate>,
    stop: Option<NaiveDate>,
) -> anyhow::Result<Option<DateRange>> {
    if start.is_none() && stop.is_none() {
        return Ok(None);
    }
    let start = start.unwrap_or(open_start());
    let end = stop.unwrap_or(open_end());
    if start > end {
        bail!("--start-date {start} is after --stop-date {end}");
    }
    Ok(Some(DateRange { start, end }))
}

fn open_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1800, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn open_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Parse a human-friendly date string into a calendar date.
///
/// Supports three formats:
/// - Relative interval: `"20d"` (20 days before today)
/// - ISO date: `"2025-01-02"`
/// - ISO datetime: `"2025-01-02T14:30:00"` (time part ignored)
pub(crate) fn parse_date_or_interval(s: &str) -> anyhow::Result<NaiveDate> {
    if let Some(days_str) = s.strip_suffix('d') {
        if let Ok(days) = days_str.parse::<u64>() {
            let today = Local::now().date_naive();
            if let Some(date) = today.checked_sub_days(chrono::Days::new(days)) {
                return Ok(date);
            }
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    anyhow::bail!(
        "Cannot parse '{}' as a date. Expected ISO date (2025-01-02), \
         datetime (2025-01-02T14:30:00), or interval (20d)",
        s
    )
}

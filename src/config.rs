//!
//! src/config.rs
//!
//! CLI arguments plus environment overrides for the http client
//! and logger
//!

use std::path::PathBuf;
use std::time;

use clap::Parser;

use crate::errors::ScrapeError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;

pub const DEFAULT_USER_AGENT: &str =
    concat!("spotify2csv/", env!("CARGO_PKG_VERSION"));

/// Convert Spotify URLs to tracks info in CSV format.
#[derive(Debug, Parser)]
#[command(name = "spotify2csv", version, about)]
pub struct Args {
    /// The Spotify URLs list (one per line) file
    #[arg(value_name = "input")]
    pub in_file: PathBuf,

    /// The filename for saving the CSV data
    #[arg(value_name = "output")]
    pub out_file: PathBuf,

    /// Re-fetch tracks that already have their info
    #[arg(short, long)]
    pub update: bool
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub user_agent: String,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default()
        }
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,spotify2csv=debug,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: false
        }
    }
}

///
/// AppConfig which holds everything one run needs
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub in_file: PathBuf,
    pub out_file: PathBuf,
    pub force_update: bool,
    pub http: HttpConfig,
    pub logging: LoggingConfig
}

fn env_to_millis(key: &str) -> Result<Option<time::Duration>, ScrapeError> {
    match std::env::var(key) {
        Ok(v) => {
            let ms = v.trim().parse::<u64>()
                .map_err(|_| ScrapeError::Config(
                    format!("{key} must be an integer millisecond count")
                ))?;
            Ok(Some(time::Duration::from_millis(ms)))
        }
        Err(_) => Ok(None)
    }
}

/// Fold environment overrides into the argument-derived config.
pub fn build_config(args: Args) -> Result<AppConfig, ScrapeError> {
    let mut http = HttpConfig::default();

    if let Ok(ua) = std::env::var("SPOTIFY2CSV_USER_AGENT") {
        if !ua.trim().is_empty() {
            http.user_agent = ua.trim().to_string();
        }
    }
    if let Some(timeout) = env_to_millis("SPOTIFY2CSV_HTTP_TIMEOUT_MS")? {
        http.timeout = timeout;
    }
    if let Some(timeout) = env_to_millis("SPOTIFY2CSV_CONNECT_TIMEOUT_MS")? {
        http.connect_timeout = timeout;
    }

    Ok(AppConfig {
        in_file: args.in_file,
        out_file: args.out_file,
        force_update: args.update,
        http,
        logging: LoggingConfig::default()
    })
}

/// Parse the command line and return the run configuration.
pub fn load_config() -> Result<AppConfig, ScrapeError> {
    dotenvy::dotenv().ok();
    build_config(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_paths_and_update_flag() {
        let args = Args::try_parse_from(
            ["spotify2csv", "urls.txt", "tracks.csv", "--update"]
        ).unwrap();

        assert_eq!(args.in_file, PathBuf::from("urls.txt"));
        assert_eq!(args.out_file, PathBuf::from("tracks.csv"));
        assert!(args.update);
    }

    #[test]
    fn update_defaults_to_off() {
        let args = Args::try_parse_from(
            ["spotify2csv", "urls.txt", "tracks.csv"]
        ).unwrap();
        assert!(!args.update);
    }

    #[test]
    fn missing_positionals_are_rejected() {
        assert!(Args::try_parse_from(["spotify2csv", "urls.txt"]).is_err());
    }

    #[test]
    fn http_defaults_are_sane() {
        let http = HttpConfig::default();
        assert_eq!(http.timeout, time::Duration::from_millis(HTTP_TIMEOUT));
        assert_eq!(http.retry.max_attempts, RETRY_MAX_ATTEMPTS);
        assert!(http.user_agent.starts_with("spotify2csv/"));
    }
}

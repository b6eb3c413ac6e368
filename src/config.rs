use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::attachment::{DEFAULT_POLL_INTERVAL, DownloadOptions};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub cmd_url: String,
    pub download_dir: PathBuf,
    pub download_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub log_filter: String,
}

impl Config {
    pub fn load() -> Self {
        let cmd_url = env::var("WCF_CMD_URL").unwrap_or_else(|_| DEFAULT_CMD_URL.to_string());
        let cmd_url = cmd_url.trim_end_matches('/').to_string();

        let download_dir = env::var("WCF_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_download_dir());
        let download_timeout_secs = env_number("WCF_DOWNLOAD_TIMEOUT").unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        let poll_interval_ms = env_number("WCF_POLL_INTERVAL_MS")
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL.as_millis() as u64);

        let log_filter = env::var("WCF_LOG")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Self {
            cmd_url,
            download_dir,
            download_timeout_secs,
            poll_interval_ms,
            log_filter,
        }
    }

    pub fn download_options(&self, timeout_secs: Option<u64>) -> DownloadOptions {
        DownloadOptions {
            timeout_secs: timeout_secs.unwrap_or(self.download_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

const DEFAULT_CMD_URL: &str = "ws://127.0.0.1:10086";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "warn";

fn env_number(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn default_download_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

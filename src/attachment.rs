//! Two-phase attachment download.
//!
//! The service only acknowledges `DownloadAttach`; the transfer and
//! decryption finish in the background with no completion signal. The client
//! polls `DecryptImage` on a fixed cadence until it returns a path, the probe
//! budget runs out, or the caller cancels. Cancelling only stops the wait: the
//! remote transfer may still complete later.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientError, CmdClient};
use crate::transport::Transport;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download trigger rejected with status {status}")]
    Trigger { status: i32 },
    #[error("attachment not ready after {probes} probes")]
    Timeout { probes: u32 },
    #[error("download cancelled after {probes} probes")]
    Cancelled { probes: u32 },
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Clone, Debug)]
pub struct DownloadOptions {
    /// Whole seconds to wait for the transfer.
    pub timeout_secs: u64,
    pub poll_interval: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DownloadOptions {
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Self::default()
        }
    }

    fn period(&self) -> Duration {
        self.poll_interval.max(Duration::from_micros(1))
    }

    /// Probes that fit in the timeout; two per second at the default cadence.
    pub fn max_probes(&self) -> u32 {
        let budget = u128::from(self.timeout_secs) * 1_000_000;
        let period = self.period().as_micros();
        let probes = budget.div_ceil(period);
        u32::try_from(probes).unwrap_or(u32::MAX)
    }
}

impl<T: Transport> CmdClient<T> {
    /// Downloads the image of message `msg_id` into `dir` (which must exist)
    /// and returns the decrypted file's path.
    pub async fn download_image(
        &self,
        msg_id: u64,
        extra: &str,
        dir: &str,
        timeout_secs: u64,
    ) -> Result<String, DownloadError> {
        let options = DownloadOptions::with_timeout(timeout_secs);
        self.download_image_with(msg_id, extra, dir, &options, &CancellationToken::new())
            .await
    }

    pub async fn download_image_with(
        &self,
        msg_id: u64,
        extra: &str,
        dir: &str,
        options: &DownloadOptions,
        cancel: &CancellationToken,
    ) -> Result<String, DownloadError> {
        match self.download_attach(msg_id, "", extra).await {
            Ok(()) => {}
            Err(ClientError::Failed { status, .. }) => {
                warn!(msg_id, status, "failed to download image");
                return Err(DownloadError::Trigger { status });
            }
            Err(error) => return Err(error.into()),
        }

        let period = options.period();
        let max_probes = options.max_probes();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut probes = 0u32;
        while probes < max_probes {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(msg_id, probes, "image download cancelled");
                    return Err(DownloadError::Cancelled { probes });
                }
                _ = ticker.tick() => {}
            }

            probes += 1;
            let path = self.decrypt_image(extra, dir).await?;
            if !path.is_empty() {
                debug!(msg_id, probes, %path, "image downloaded");
                return Ok(path);
            }
        }

        warn!(msg_id, probes, timeout_secs = options.timeout_secs, "download image timeout");
        Err(DownloadError::Timeout { probes })
    }
}

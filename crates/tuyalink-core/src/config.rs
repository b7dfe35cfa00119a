// ── Runtime coordinator configuration ──
//
// These types describe *which* device to track and how often. They carry
// credential data and timing, but never touch disk. The CLI constructs a
// `CoordinatorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use tuyalink_api::Credentials;

use crate::model::S6_DATA_POINTS;

/// Default scheduled refresh period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default verify-loop deadline.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(8);

/// Default pause between verify polls.
pub const DEFAULT_VERIFY_INTERVAL: Duration = Duration::from_millis(800);

/// Timing of a send-with-verification loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOptions {
    /// Give up verifying after this long.
    pub timeout: Duration,
    /// Sleep between status polls.
    pub interval: Duration,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_VERIFY_TIMEOUT,
            interval: DEFAULT_VERIFY_INTERVAL,
        }
    }
}

/// Configuration for tracking a single device.
///
/// Built by the CLI, passed to `Coordinator`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Cloud project credentials and region selector.
    pub credentials: Credentials,
    /// Device to read and command.
    pub device_id: String,
    /// Scheduled refresh period. `Duration::ZERO` disables the scheduler.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Extra CA certificate for the HTTPS client.
    pub ca_cert: Option<PathBuf>,
    /// Data points every published snapshot must contain.
    pub known_data_points: Vec<String>,
    /// Defaults for [`Coordinator::send_commands`](crate::Coordinator::send_commands).
    pub command_defaults: CommandOptions,
}

impl CoordinatorConfig {
    /// Defaults for an S6 alarm panel: 30 s polling, 15 s HTTP timeout.
    pub fn new(credentials: Credentials, device_id: impl Into<String>) -> Self {
        Self {
            credentials,
            device_id: device_id.into().trim().to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: tuyalink_api::transport::DEFAULT_TIMEOUT,
            ca_cert: None,
            known_data_points: S6_DATA_POINTS.iter().map(|&s| s.to_owned()).collect(),
            command_defaults: CommandOptions::default(),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_known_data_points<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_data_points = codes.into_iter().map(Into::into).collect();
        self
    }
}

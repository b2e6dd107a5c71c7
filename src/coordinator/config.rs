//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum time between two executed completion checks for the
    /// same run, measured from check start
    #[serde(default = "default_debounce_ms", rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// Settling delay between passing the guards and executing the
    /// check, letting near-simultaneous triggers coalesce
    #[serde(default = "default_coalesce_ms", rename = "coalesce-ms")]
    pub coalesce_ms: u64,

    /// Upper bound on each remote call; on expiry the call counts as
    /// failed and the in-flight guard is released
    #[serde(default = "default_check_timeout_ms", rename = "check-timeout-ms")]
    pub check_timeout_ms: u64,

    /// Channel buffer size for coordinator requests
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Channel buffer size for completion notices
    #[serde(default = "default_notice_buffer", rename = "notice-buffer")]
    pub notice_buffer: usize,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_coalesce_ms() -> u64 {
    100
}

fn default_check_timeout_ms() -> u64 {
    10_000
}

fn default_channel_buffer() -> usize {
    100
}

fn default_notice_buffer() -> usize {
    32
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            coalesce_ms: default_coalesce_ms(),
            check_timeout_ms: default_check_timeout_ms(),
            channel_buffer: default_channel_buffer(),
            notice_buffer: default_notice_buffer(),
        }
    }
}

impl CoordinatorConfig {
    /// Get the debounce window as a Duration
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get the coalescing delay as a Duration
    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    /// Get the remote call timeout as a Duration
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

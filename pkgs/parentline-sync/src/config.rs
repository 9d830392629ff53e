use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            user_agent: format!("parentline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Synchronization engine settings
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// A page shorter than this means the history is exhausted
    pub page_size: usize,
    /// Budget for the single-message fallback fetch
    pub single_fetch_timeout: Duration,
    /// Delay before a list invalidation is published
    pub settle_delay: Duration,
    /// Pause between stack pushes while screens mount
    pub mount_delay: Duration,
    /// Repeated deliveries of one link inside this window are dropped
    pub link_dedup_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            single_fetch_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(300),
            mount_delay: Duration::from_millis(100),
            link_dedup_window: Duration::from_secs(2),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SyncError::InvalidConfig("page_size"));
        }
        if self.single_fetch_timeout.is_zero() {
            return Err(SyncError::InvalidConfig("single_fetch_timeout"));
        }
        Ok(())
    }
}

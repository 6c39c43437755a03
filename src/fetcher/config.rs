use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[fetch]` table of the config file. Unset keys take the defaults below.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct FetchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_after_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_unit_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Honour HTTP(S)_PROXY from the environment (default true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_proxy: Option<bool>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs.unwrap_or(30)) }
    pub fn max_retries(&self) -> u32 { self.max_retries.unwrap_or(1) }
    /// Upper bound for a server's `Retry-After` hint, in backoff units.
    pub fn max_retry_after(&self) -> u64 { self.max_retry_after_secs.unwrap_or(300) }
    pub fn backoff_unit(&self) -> Duration { Duration::from_millis(self.backoff_unit_ms.unwrap_or(1000)) }
    /// None runs every scheduled film at once.
    pub fn concurrency(&self) -> Option<usize> { self.concurrency.filter(|n| *n > 0) }
    pub fn system_proxy(&self) -> bool { self.system_proxy.unwrap_or(true) }
}

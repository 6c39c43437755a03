pub mod config;
pub mod identity;

use anyhow::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, SeedableRng};
use reqwest::{header::RETRY_AFTER, StatusCode};
use std::sync::Mutex;
use url::Url;

pub use config::FetchConfig;
pub use identity::Identity;

/// Anything that can turn a film url into page content. Failures come back
/// as an empty string.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str, debug: bool) -> String;
}

/// HTTP page fetcher with per-request identity rotation and 429 backoff.
pub struct Fetcher {
    client: reqwest::Client,
    rng: Mutex<StdRng>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Build with an explicit RNG, e.g. a seeded one in tests.
    pub fn with_rng(config: FetchConfig, rng: StdRng) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout());
        if !config.system_proxy() {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { client, rng: Mutex::new(rng), config })
    }

    pub fn config(&self) -> &FetchConfig { &self.config }

    fn identity(&self, url: &Url) -> Identity {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Identity::generate(url, &mut *rng)
    }

    fn backoff(&self, retry_after: u64) -> std::time::Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        identity::backoff_delay(retry_after.min(self.config.max_retry_after()), self.config.backoff_unit(), &mut *rng)
    }

    /// Fetch `url`; rate limits, bad statuses and transport errors all end
    /// in an empty string after being logged.
    pub async fn fetch_page(&self, url: &str, debug: bool) -> String {
        let parsed = match Url::parse(url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            Ok(u) => {
                tracing::warn!(url, scheme = u.scheme(), "unsupported url scheme, skipping");
                return String::new();
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "invalid url, skipping");
                return String::new();
            }
        };

        let mut retries = 0;
        loop {
            let identity = self.identity(&parsed);
            if debug {
                tracing::info!(url, ip = %identity.client_ip, user_agent = identity.user_agent, referer = %identity.referer, "fetching");
            }
            let resp = match self.client.get(parsed.clone()).headers(identity.headers()).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(url, error = %e, "request failed");
                    return String::new();
                }
            };
            let status = resp.status();
            if debug {
                tracing::info!(url, %status, "response");
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.config.max_retries() {
                    tracing::warn!(url, attempts = retries + 1, "still rate limited, skipping until next run");
                    return String::new();
                }
                retries += 1;
                let wait = self.backoff(retry_after_secs(&resp));
                tracing::info!(url, wait_ms = wait.as_millis() as u64, "rate limited, rotating identity and backing off");
                tokio::time::sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                tracing::warn!(url, %status, "unexpected status, skipping");
                return String::new();
            }
            return match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url, error = %e, "failed to read response body");
                    String::new()
                }
            };
        }
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, url: &str, debug: bool) -> String {
        self.fetch_page(url, debug).await
    }
}

// Only the delta-seconds form is honoured; an HTTP date counts as no hint.
fn retry_after_secs(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

use std::net::Ipv4Addr;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use url::Url;

/// Headers that proxies use to pass on the client address. All of them
/// carry the same spoofed address for one request.
pub const CLIENT_IP_HEADERS: [&str; 7] = [
    "X-Originating-IP",
    "X-Forwarded-For",
    "X-Remote-IP",
    "X-Remote-Addr",
    "X-Client-IP",
    "X-Host",
    "X-Forwarded-Host",
];

/// (user agent, sec-ch-ua, sec-ch-ua-platform)
const SIGNATURES: [(&str, Option<&str>, Option<&str>); 6] = [
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        Some(r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
        Some(r#""Windows""#),
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        Some(r#""Google Chrome";v="123", "Not:A-Brand";v="8", "Chromium";v="123""#),
        Some(r#""macOS""#),
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
        Some(r#""Chromium";v="124", "Microsoft Edge";v="124", "Not-A.Brand";v="99""#),
        Some(r#""Windows""#),
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        Some(r#""Chromium";v="122", "Not(A:Brand";v="24", "Google Chrome";v="122""#),
        Some(r#""Linux""#),
    ),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0", None, None),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        None,
        None,
    ),
];

// First octets of private, loopback, link-local and shared ranges.
const RESERVED_FIRST_OCTETS: [u8; 6] = [10, 100, 127, 169, 172, 192];

/// Spoofed client identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub origin: String,
    pub referer: String,
    pub client_ip: Ipv4Addr,
    pub user_agent: &'static str,
    pub sec_ch_ua: Option<&'static str>,
    pub platform: Option<&'static str>,
}

impl Identity {
    /// Build an identity for `url`. Origin and referer stay on the url's own
    /// host; everything else is drawn from `rng`.
    pub fn generate<R: Rng + ?Sized>(url: &Url, rng: &mut R) -> Self {
        let origin = url.origin().ascii_serialization();
        let referer = if rng.random_bool(0.5) { format!("{origin}/") } else { url.to_string() };
        let (user_agent, sec_ch_ua, platform) = SIGNATURES[rng.random_range(0..SIGNATURES.len())];
        Self { origin, referer, client_ip: random_public_ipv4(rng), user_agent, sec_ch_ua, platform }
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        if let Ok(v) = HeaderValue::from_str(&self.origin) { headers.insert(ORIGIN, v); }
        if let Ok(v) = HeaderValue::from_str(&self.referer) { headers.insert(REFERER, v); }
        if let Some(v) = self.sec_ch_ua { headers.insert("sec-ch-ua", HeaderValue::from_static(v)); }
        if let Some(v) = self.platform { headers.insert("sec-ch-ua-platform", HeaderValue::from_static(v)); }
        let ip = self.client_ip.to_string();
        for name in CLIENT_IP_HEADERS {
            if let (Ok(n), Ok(v)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&ip)) {
                headers.insert(n, v);
            }
        }
        headers
    }
}

pub fn random_public_ipv4<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    let first = loop {
        let o = rng.random_range(1..=223u8);
        if !RESERVED_FIRST_OCTETS.contains(&o) { break o; }
    };
    Ipv4Addr::new(first, rng.random_range(1..=253), rng.random_range(1..=253), rng.random_range(1..=253))
}

/// Wait before retrying a rate-limited request: the server's hint plus 5 to
/// 10 units of jitter.
pub fn backoff_delay<R: Rng + ?Sized>(retry_after: u64, unit: Duration, rng: &mut R) -> Duration {
    let units = retry_after.saturating_add(rng.random_range(5..=10u64));
    unit.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
}

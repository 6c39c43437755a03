use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use filmix::fetcher::{FetchConfig, Fetcher};
use rand::{rngs::StdRng, SeedableRng};

const PAGE: &str = r#"<html><body><h1 class="name">Heat</h1><div class="quality">HD 1080</div></body></html>"#;

#[derive(Clone, Default)]
struct Seen {
    hits: Arc<AtomicUsize>,
    client_ips: Arc<Mutex<Vec<String>>>,
    // Retry-After value sent with the first 429 on /hinted
    retry_after: &'static str,
}

impl Seen {
    fn record(&self, headers: &HeaderMap) -> usize {
        let ip = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()).unwrap_or_default();
        self.client_ips.lock().unwrap().push(ip.to_string());
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn rate_limited() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "0")], "slow down").into_response()
}

async fn film(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record(&headers);
    let ip = headers.get("x-forwarded-for");
    let consistent = ["x-originating-ip", "x-remote-ip", "x-remote-addr", "x-client-ip", "x-host", "x-forwarded-host"]
        .iter()
        .all(|h| headers.get(*h) == ip);
    if ip.is_none() || !consistent || headers.get(header::USER_AGENT).is_none() || headers.get(header::REFERER).is_none() {
        return (StatusCode::BAD_REQUEST, "missing identity").into_response();
    }
    Html(PAGE).into_response()
}

async fn flaky(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    if seen.record(&headers) == 1 { rate_limited() } else { Html(PAGE).into_response() }
}

async fn hinted(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    if seen.record(&headers) == 1 {
        (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, seen.retry_after)], "slow down").into_response()
    } else {
        Html(PAGE).into_response()
    }
}

async fn limited(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record(&headers);
    rate_limited()
}

async fn missing() -> Response {
    (StatusCode::NOT_FOUND, Html("<h1 class=\"name\">Not Found</h1>")).into_response()
}

async fn serve(seen: Seen) -> SocketAddr {
    let app = Router::new()
        .route("/film", get(film))
        .route("/flaky", get(flaky))
        .route("/hinted", get(hinted))
        .route("/limited", get(limited))
        .route("/missing", get(missing))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetcher() -> Fetcher {
    let config = FetchConfig { timeout_secs: Some(5), backoff_unit_ms: Some(1), system_proxy: Some(false), ..Default::default() };
    Fetcher::with_rng(config, StdRng::seed_from_u64(42)).unwrap()
}

#[tokio::test]
async fn sends_a_full_identity() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let body = fetcher().fetch_page(&format!("http://{addr}/film"), true).await;
    assert_eq!(body, PAGE);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_once_after_rate_limit() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let body = fetcher().fetch_page(&format!("http://{addr}/flaky"), false).await;
    assert_eq!(body, PAGE);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 2);
    assert_eq!(seen.client_ips.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn gives_up_when_still_rate_limited() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let body = fetcher().fetch_page(&format!("http://{addr}/limited"), false).await;
    assert!(body.is_empty());
    assert_eq!(seen.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn more_retries_when_configured() {
    let seen = Seen::default();
    let addr = serve(seen.clone()).await;
    let config = FetchConfig { max_retries: Some(3), backoff_unit_ms: Some(1), system_proxy: Some(false), ..Default::default() };
    let fetcher = Fetcher::with_rng(config, StdRng::seed_from_u64(1)).unwrap();
    assert!(fetcher.fetch_page(&format!("http://{addr}/limited"), false).await.is_empty());
    assert_eq!(seen.hits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn error_status_yields_empty_content() {
    let addr = serve(Seen::default()).await;
    assert!(fetcher().fetch_page(&format!("http://{addr}/missing"), false).await.is_empty());
}

#[tokio::test]
async fn transport_failures_yield_empty_content() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert!(fetcher().fetch_page(&format!("http://{addr}/film"), false).await.is_empty());
    assert!(fetcher().fetch_page("not a url", false).await.is_empty());
    assert!(fetcher().fetch_page("ftp://example.com/film", false).await.is_empty());
}

fn fetcher_with(config: FetchConfig) -> Fetcher {
    let config = FetchConfig { system_proxy: Some(false), timeout_secs: Some(5), ..config };
    Fetcher::with_rng(config, StdRng::seed_from_u64(7)).unwrap()
}

#[tokio::test]
async fn waits_for_the_retry_after_hint_plus_jitter() {
    let seen = Seen { retry_after: "3", ..Seen::default() };
    let addr = serve(seen.clone()).await;
    let fetcher = fetcher_with(FetchConfig { backoff_unit_ms: Some(20), ..Default::default() });

    let started = Instant::now();
    let body = fetcher.fetch_page(&format!("http://{addr}/hinted"), false).await;
    let elapsed = started.elapsed();
    assert_eq!(body, PAGE);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 2);
    // (3 + at least 5 jitter units) * 20ms
    assert!(elapsed >= Duration::from_millis(160), "waited only {elapsed:?}");
}

#[tokio::test]
async fn huge_retry_after_hint_is_capped() {
    let seen = Seen { retry_after: "100000", ..Seen::default() };
    let addr = serve(seen.clone()).await;
    let fetcher = fetcher_with(FetchConfig { backoff_unit_ms: Some(10), max_retry_after_secs: Some(2), ..Default::default() });

    let started = Instant::now();
    let body = fetcher.fetch_page(&format!("http://{addr}/hinted"), false).await;
    let elapsed = started.elapsed();
    assert_eq!(body, PAGE);
    // Capped to (2 + 5..=10) * 10ms instead of 100000 units
    assert!(elapsed >= Duration::from_millis(70), "waited only {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "cap not applied, waited {elapsed:?}");
}

#[tokio::test]
async fn http_date_retry_after_counts_as_no_hint() {
    let seen = Seen { retry_after: "Wed, 21 Oct 2099 07:28:00 GMT", ..Seen::default() };
    let addr = serve(seen.clone()).await;
    let fetcher = fetcher_with(FetchConfig { backoff_unit_ms: Some(10), ..Default::default() });

    let started = Instant::now();
    let body = fetcher.fetch_page(&format!("http://{addr}/hinted"), false).await;
    let elapsed = started.elapsed();
    assert_eq!(body, PAGE);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 2);
    // Jitter only: 5..=10 units of 10ms
    assert!(elapsed >= Duration::from_millis(50), "waited only {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "date treated as a delay, waited {elapsed:?}");
}

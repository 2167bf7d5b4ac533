//! Rate-limit-aware GitHub REST client.
//!
//! Every request issued by the crate goes through [`GitHubClient`], which
//! tracks the shared request quota, blocks when it is exhausted, retries
//! transient failures with exponential backoff and walks paginated listings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::github::clock::{Clock, SystemClock};
use crate::github::error::GitHubError;
use crate::github::rate_limit::{
    extract_rate_limit_from_headers, parse_retry_after, RateLimitContext,
};
use crate::github::retry::RetryPolicy;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Items requested per page.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Extra time slept past a quota reset.
pub const DEFAULT_QUOTA_MARGIN: Duration = Duration::from_secs(1);

/// Quota wait used when a rejection carries no reset information.
pub const FALLBACK_QUOTA_WAIT: Duration = Duration::from_secs(60);

/// HTTP request timeout for API calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.github.com` or a GitHub Enterprise `/api/v3` root.
    pub base_url: String,
    /// Access token; `None` runs unauthenticated.
    pub token: Option<String>,
    /// Page size for listings.
    pub per_page: u32,
    /// Backoff for transient failures.
    pub retry: RetryPolicy,
    /// Extra time slept past a quota reset.
    pub quota_margin: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            retry: RetryPolicy::default(),
            quota_margin: DEFAULT_QUOTA_MARGIN,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `base_url` with default limits.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            ..Self::default()
        }
    }
}

/// A response that either carries a resource or reports its absence (404).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    /// The resource exists.
    Found(T),
    /// The platform answered 404.
    Absent,
}

impl<T> ApiResponse<T> {
    /// Converts into an `Option`, mapping `Absent` to `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }
}

/// A successful HTTP response with its body read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        serde_json::from_str(&self.body).map_err(|e| GitHubError::MalformedResponse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// How a single HTTP exchange is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    NotFound,
    RateLimited(QuotaRelease),
    Transient(String),
    Unauthorized,
    Rejected,
}

/// When a quota rejection lifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuotaRelease {
    /// The hourly budget is spent until this reset.
    Reset(DateTime<Utc>),
    /// The server asked for a pause (`Retry-After`, secondary limits) until this time.
    Pause(DateTime<Utc>),
}

/// Classifies a response. Pure so the quota rules can be tested without a server.
pub(crate) fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    now: DateTime<Utc>,
) -> Outcome {
    if status.is_success() {
        return Outcome::Success;
    }
    if status == StatusCode::NOT_FOUND {
        return Outcome::NotFound;
    }
    if is_quota_rejection(status, headers, body) {
        return Outcome::RateLimited(quota_release(headers, now));
    }
    if status.is_server_error() {
        return Outcome::Transient(format!("HTTP {status}"));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Outcome::Unauthorized;
    }
    Outcome::Rejected
}

fn is_quota_rejection(status: StatusCode, headers: &HeaderMap, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted
        || parse_retry_after(headers).is_some()
        || body.to_ascii_lowercase().contains("rate limit")
}

/// How long a quota rejection lasts.
///
/// `Retry-After` wins whenever present. The reset timestamp only counts when
/// the response also reports the budget as spent; a secondary limit carries a
/// far-off hourly reset that must not block the client.
fn quota_release(headers: &HeaderMap, now: DateTime<Utc>) -> QuotaRelease {
    if let Some(seconds) = parse_retry_after(headers) {
        return QuotaRelease::Pause(after(now, Duration::from_secs(seconds)));
    }
    if let Some(info) = extract_rate_limit_from_headers(headers).filter(|info| info.remaining == 0) {
        return QuotaRelease::Reset(info.reset_at);
    }
    QuotaRelease::Pause(after(now, FALLBACK_QUOTA_WAIT))
}

fn after(now: DateTime<Utc>, wait: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(wait)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// What to fetch after a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageStep {
    /// Follow the `rel="next"` link.
    Follow(String),
    /// Request the next page number.
    NextPage,
    /// The listing is complete.
    Done,
}

/// Decides the next page from the `Link` header, or by counting when it is absent.
pub(crate) fn pagination_step(headers: &HeaderMap, items: usize, per_page: u32) -> PageStep {
    if let Some(link) = headers.get(LINK) {
        return link
            .to_str()
            .ok()
            .and_then(parse_next_link)
            .map_or(PageStep::Done, PageStep::Follow);
    }
    if items == 0 || items < per_page as usize {
        PageStep::Done
    } else {
        PageStep::NextPage
    }
}

/// Extracts the `rel="next"` target from a `Link` header value.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == r#"rel="next""# || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// GitHub REST client shared by every component of a run.
#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: ClientConfig,
    base_url: Url,
    clock: Arc<dyn Clock>,
    rate_limit: Mutex<RateLimitContext>,
    request_count: AtomicU64,
}

impl GitHubClient {
    /// Creates a client on the system clock.
    pub fn new(config: ClientConfig) -> Result<Self, GitHubError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a client on the given clock.
    pub fn with_clock(mut config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self, GitHubError> {
        config.token = config
            .token
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        config.per_page = config.per_page.clamp(1, 100);

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            GitHubError::Configuration(format!("invalid API URL '{}': {e}", config.base_url))
        })?;

        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = &config.token {
            let mut auth = HeaderValue::from_str(&format!("token {token}")).map_err(|e| {
                GitHubError::Configuration(format!("token is not a valid header value: {e}"))
            })?;
            auth.set_sensitive(true);
            let _ = headers.insert(AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("forkscope/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GitHubError::Configuration(format!("failed to build HTTP client: {e}")))?;

        debug!(
            base_url = %base_url,
            authenticated = config.token.is_some(),
            "Created GitHub client"
        );

        Ok(Self {
            http,
            config,
            base_url,
            clock,
            rate_limit: Mutex::new(RateLimitContext::default()),
            request_count: AtomicU64::new(0),
        })
    }

    /// Whether requests carry a credential.
    pub fn is_authenticated(&self) -> bool {
        self.config.token.is_some()
    }

    /// Copy of the current quota state.
    pub fn rate_limit_snapshot(&self) -> RateLimitContext {
        self.lock_rate_limit().clone()
    }

    /// Number of HTTP requests sent so far, retries included.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// The clock used for waits.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issues a request and returns the raw response, or `Absent` on 404.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<RawResponse>, GitHubError> {
        let url = self.resolve(path, params)?;
        self.execute(&method, &url, path).await
    }

    /// Issues a GET and deserializes the body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, GitHubError> {
        match self.request(Method::GET, path, params).await? {
            ApiResponse::Found(raw) => raw.json(path).map(ApiResponse::Found),
            ApiResponse::Absent => Ok(ApiResponse::Absent),
        }
    }

    /// Fetches every page of a listing and returns the items in order.
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, GitHubError> {
        let mut page: u32 = 1;
        let mut url = self.page_url(path, params, page)?;
        let mut items = Vec::new();

        loop {
            let raw = match self.execute(&Method::GET, &url, path).await? {
                ApiResponse::Found(raw) => raw,
                ApiResponse::Absent => {
                    debug!(path, page, "Listing page absent, ending pagination");
                    break;
                }
            };

            let batch: Vec<T> = raw.json(path)?;
            let count = batch.len();
            items.extend(batch);
            debug!(path, page, count, total = items.len(), "Fetched listing page");

            match pagination_step(&raw.headers, count, self.config.per_page) {
                PageStep::Follow(next) => {
                    url = self.resolve(&next, &[])?;
                    page += 1;
                }
                PageStep::NextPage => {
                    page += 1;
                    url = self.page_url(path, params, page)?;
                }
                PageStep::Done => break,
            }
        }

        Ok(items)
    }

    fn page_url(&self, path: &str, params: &[(&str, &str)], page: u32) -> Result<Url, GitHubError> {
        let per_page = self.config.per_page.to_string();
        let page = page.to_string();
        let mut query = params.to_vec();
        query.push(("per_page", &per_page));
        query.push(("page", &page));
        self.resolve(path, &query)
    }

    /// Resolves an API path, or an absolute link under the API root.
    fn resolve(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, GitHubError> {
        let root = self.base_url.as_str().trim_end_matches('/');
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            if !path.starts_with(root) {
                return Err(GitHubError::MalformedResponse {
                    path: path.to_string(),
                    message: format!("pagination link leaves the API root {root}"),
                });
            }
            Url::parse(path)
        } else {
            let separator = if path.starts_with('/') { "" } else { "/" };
            Url::parse(&format!("{root}{separator}{path}"))
        }
        .map_err(|e| GitHubError::Configuration(format!("invalid request URL for {path}: {e}")))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                let _ = pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Sends a request until it succeeds, is absent, or fails for good.
    async fn execute(
        &self,
        method: &Method,
        url: &Url,
        path: &str,
    ) -> Result<ApiResponse<RawResponse>, GitHubError> {
        let mut attempts: u32 = 0;
        let mut transient_failures: u32 = 0;
        let mut quota_retried = false;

        loop {
            self.wait_for_quota().await;
            attempts += 1;

            let failure = match self.send_once(method, url).await {
                Ok(raw) => match classify_response(raw.status, &raw.headers, &raw.body, self.clock.now()) {
                    Outcome::Success => return Ok(ApiResponse::Found(raw)),
                    Outcome::NotFound => {
                        debug!(path, "Resource absent");
                        return Ok(ApiResponse::Absent);
                    }
                    Outcome::RateLimited(release) => {
                        if quota_retried {
                            warn!(path, "Quota rejected twice in a row, giving up on request");
                            return Err(GitHubError::TransientFailure {
                                path: path.to_string(),
                                attempts,
                                message: format!("HTTP {}: quota rejected after waiting for reset", raw.status),
                            });
                        }
                        quota_retried = true;
                        let mut quota = self.lock_rate_limit();
                        match release {
                            QuotaRelease::Reset(reset_at) => {
                                info!(path, status = %raw.status, %reset_at, "Request quota exhausted");
                                quota.exhaust_until(reset_at);
                            }
                            QuotaRelease::Pause(resume_at) => {
                                info!(path, status = %raw.status, %resume_at, "Server asked to pause requests");
                                quota.pause_until(resume_at);
                            }
                        }
                        continue;
                    }
                    Outcome::Unauthorized => {
                        return Err(GitHubError::AuthorizationFailure {
                            path: path.to_string(),
                            status: raw.status.as_u16(),
                        });
                    }
                    Outcome::Rejected => {
                        return Err(GitHubError::Rejected {
                            path: path.to_string(),
                            status: raw.status.as_u16(),
                        });
                    }
                    Outcome::Transient(message) => message,
                },
                Err(e) => e.to_string(),
            };

            quota_retried = false;
            transient_failures += 1;
            let Some(delay) = self.config.retry.delay_after(transient_failures) else {
                warn!(path, attempts, error = %failure, "Retries exhausted");
                return Err(GitHubError::TransientFailure {
                    path: path.to_string(),
                    attempts,
                    message: failure,
                });
            };
            warn!(
                path,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Transient failure, retrying"
            );
            self.clock.sleep(delay).await;
        }
    }

    async fn send_once(&self, method: &Method, url: &Url) -> Result<RawResponse, reqwest::Error> {
        let _ = self.request_count.fetch_add(1, Ordering::Relaxed);
        debug!(%method, %url, "Sending request");

        let response = self.http.request(method.clone(), url.clone()).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        if let Some(info) = extract_rate_limit_from_headers(&headers) {
            self.lock_rate_limit().observe(info);
        }
        let body = response.text().await?;

        debug!(%url, %status, body_len = body.len(), "Received response");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Blocks until the quota resets when the last response reported it exhausted.
    async fn wait_for_quota(&self) {
        let required = self
            .lock_rate_limit()
            .wait_required(self.clock.now(), self.config.quota_margin);
        let Some(total) = required else {
            return;
        };
        warn!(
            wait_secs = total.as_secs(),
            "Request quota exhausted, waiting for reset"
        );
        self.clock.sleep(total).await;
        self.lock_rate_limit().record_wait(total);
    }

    fn lock_rate_limit(&self) -> MutexGuard<'_, RateLimitContext> {
        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

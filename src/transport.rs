//! Paced, cookie-aware HTTP transport shared by the scraper and the catalog client.

use crate::headers;
use crate::types::{ClientEvent, ClientEventReceiver, RequestInfo, SharedEventBroadcaster, TransportConfig};
use crate::{Result, SyncError};
use http_client::{HttpClient, Request};
use http_types::{Method, StatusCode, Url};
use rand::Rng;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MAX_REDIRECTS: u32 = 5;
const DEFAULT_RETRY_AFTER: u64 = 5;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
    /// `Retry-After` header in seconds, when present
    pub retry_after: Option<u64>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Map non-success statuses onto [`SyncError`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status == 429 {
            return Err(SyncError::RateLimit {
                retry_after: self.retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            });
        }
        if !self.is_success() {
            return Err(SyncError::Status {
                status: self.status,
                url: self.url,
            });
        }
        Ok(self)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            SyncError::Parse(format!("invalid JSON from {}: {e}", self.url))
        })
    }
}

#[derive(Debug, Default)]
struct TransportState {
    last_request: HashMap<String, Instant>,
    session_established: bool,
    cookies: Vec<String>,
}

/// HTTP transport with per-host pacing and a lazily established session.
///
/// All requests issued through one transport (and its clones) are strictly
/// sequential: the internal lock is held from the pacing wait until the
/// response body has been read. Two requests to the same host are never
/// closer together than the configured minimum interval, and the timestamp
/// used for pacing is updated whether the request succeeded or failed.
///
/// The transport never retries. Retry policy belongs to the callers that
/// know whether an operation is safe to repeat.
#[derive(Clone)]
pub struct RateLimitedTransport {
    client: Arc<dyn HttpClient + Send + Sync>,
    config: TransportConfig,
    state: Arc<Mutex<TransportState>>,
    broadcaster: Arc<SharedEventBroadcaster>,
}

impl std::fmt::Debug for RateLimitedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedTransport")
            .field("config", &self.config)
            .finish()
    }
}

impl RateLimitedTransport {
    /// Create a transport on top of any [`HttpClient`] implementation.
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client used to send requests
    /// * `config` - Pacing, identity and session settings
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tracklist_sync::{RateLimitedTransport, TransportConfig};
    ///
    /// let transport = RateLimitedTransport::new(
    ///     Box::new(http_client::native::NativeClient::new()),
    ///     TransportConfig::scraping("https://www.1001tracklists.com"),
    /// );
    /// ```
    pub fn new(client: Box<dyn HttpClient + Send + Sync>, config: TransportConfig) -> Self {
        Self::with_broadcaster(client, config, Arc::new(SharedEventBroadcaster::new()))
    }

    /// Create a transport that publishes events on an existing broadcaster.
    pub fn with_broadcaster(
        client: Box<dyn HttpClient + Send + Sync>,
        config: TransportConfig,
        broadcaster: Arc<SharedEventBroadcaster>,
    ) -> Self {
        Self {
            client: Arc::from(client),
            config,
            state: Arc::new(Mutex::new(TransportState::default())),
            broadcaster,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> Arc<SharedEventBroadcaster> {
        self.broadcaster.clone()
    }

    pub fn subscribe(&self) -> ClientEventReceiver {
        self.broadcaster.subscribe()
    }

    /// Cookies currently held by the session.
    pub async fn cookies(&self) -> Vec<String> {
        self.state.lock().await.cookies.clone()
    }

    /// GET a page (or XHR endpoint) and return its body.
    pub async fn get_text(&self, url: &str, is_ajax: bool, referer: Option<&str>) -> Result<String> {
        let mut request = Request::new(Method::Get, parse_url(url)?);
        headers::add_get_headers(&mut request, is_ajax, referer);
        Ok(self.execute(request).await?.error_for_status()?.body)
    }

    /// POST a form-encoded body and return the response text.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        referer: Option<&str>,
    ) -> Result<String> {
        let mut request = Request::new(Method::Post, parse_url(url)?);
        headers::add_get_headers(&mut request, true, referer);
        headers::add_form_headers(&mut request);
        request.set_body(encode_form(form));
        Ok(self.execute(request).await?.error_for_status()?.body)
    }

    /// Send a prepared request and read the full response.
    ///
    /// Non-success statuses are returned as data; use
    /// [`TransportResponse::error_for_status`] to turn them into errors.
    pub async fn execute(&self, request: Request) -> Result<TransportResponse> {
        let mut state = self.state.lock().await;

        if !state.session_established {
            if let Some(session_url) = self.config.session_url.clone() {
                log::debug!("Establishing session via {session_url}");
                let mut bootstrap = Request::new(Method::Get, parse_url(&session_url)?);
                headers::add_get_headers(&mut bootstrap, false, None);
                self.dispatch(&mut state, bootstrap)
                    .await?
                    .error_for_status()?;
                log::debug!("Session established with {} cookies", state.cookies.len());
            }
            state.session_established = true;
        }

        self.dispatch(&mut state, request).await
    }

    /// Pace, send and follow redirects for one logical request.
    async fn dispatch(
        &self,
        state: &mut TransportState,
        mut request: Request,
    ) -> Result<TransportResponse> {
        let mut redirects = 0;

        loop {
            self.wait_for_slot(state, request.url()).await;

            if self.config.browser_identity {
                headers::add_browser_headers(&mut request);
            }
            headers::add_cookies(&mut request, &state.cookies);

            let method = request.method();
            let url = request.url().clone();
            let follow_up = if method == Method::Get {
                Some(request.clone())
            } else {
                None
            };
            let info = RequestInfo::from_request(&request);
            self.broadcaster.broadcast_event(ClientEvent::RequestStarted {
                request: info.clone(),
            });
            log::debug!("{}", info.short_description());

            let started = Instant::now();
            let sent = self.client.send(request).await;
            if let Some(host) = url.host_str() {
                state.last_request.insert(host.to_string(), Instant::now());
            }
            let mut response = sent.map_err(|e| SyncError::Http(e.to_string()))?;

            headers::store_cookies(&response, &mut state.cookies);

            let status: u16 = response.status().into();
            self.broadcaster.broadcast_event(ClientEvent::RequestCompleted {
                request: info,
                status_code: status,
                duration_ms: started.elapsed().as_millis() as u64,
            });

            if is_redirect(response.status()) {
                let location = response
                    .header("location")
                    .and_then(|h| h.get(0))
                    .map(|v| v.as_str().to_string());
                if let (Some(location), Some(mut next)) = (location, follow_up) {
                    if redirects >= MAX_REDIRECTS {
                        return Err(SyncError::Http(format!("too many redirects from {url}")));
                    }
                    let target = url
                        .join(&location)
                        .map_err(|e| SyncError::Http(format!("bad redirect target {location}: {e}")))?;
                    log::debug!("Following redirect from {url} to {target}");
                    *next.url_mut() = target;
                    next.remove_header("Cookie");
                    request = next;
                    redirects += 1;
                    continue;
                }
            }

            let retry_after = response
                .header("retry-after")
                .and_then(|h| h.get(0))
                .and_then(|v| v.as_str().trim().parse::<u64>().ok());

            let body = response
                .body_string()
                .await
                .map_err(|e| SyncError::Http(e.to_string()))?;

            if let Some(dir) = &self.config.debug_dir {
                save_debug_response(dir, &url, status, &body);
            }

            return Ok(TransportResponse {
                status,
                url: url.to_string(),
                body,
                retry_after,
            });
        }
    }

    async fn wait_for_slot(&self, state: &TransportState, url: &Url) {
        if !self.config.pacing.is_enabled() {
            return;
        }
        let Some(host) = url.host_str() else {
            return;
        };
        let Some(last) = state.last_request.get(host) else {
            return;
        };

        let interval = self.jittered_interval();
        let elapsed = last.elapsed();
        if elapsed < interval {
            let delay = interval - elapsed;
            log::trace!("Pacing {host}: waiting {}ms", delay.as_millis());
            self.broadcaster.broadcast_event(ClientEvent::Paced {
                host: host.to_string(),
                delay_ms: delay.as_millis() as u64,
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// Uniform draw from the configured pacing window.
    fn jittered_interval(&self) -> Duration {
        let min = self.config.pacing.min_interval.as_millis() as u64;
        let max = self.config.pacing.max_interval.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MovedPermanently
            | StatusCode::Found
            | StatusCode::SeeOther
            | StatusCode::TemporaryRedirect
            | StatusCode::PermanentRedirect
    )
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| SyncError::Config(format!("invalid URL {url}: {e}")))
}

pub(crate) fn encode_form(form: &[(&str, String)]) -> String {
    form.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn save_debug_response(dir: &std::path::Path, url: &Url, status: u16, body: &str) {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    let safe_path = path.replace(['/', '?', '&', '=', '%', '+'], "_");
    let file_path = dir.join(format!("{timestamp}_{safe_path}_status{status}.html"));

    let written = fs::create_dir_all(dir).and_then(|_| fs::write(&file_path, body));
    match written {
        Ok(()) => log::debug!("Saved HTTP response to {file_path:?}"),
        Err(e) => log::warn!("Failed to save debug response: {e}"),
    }
}

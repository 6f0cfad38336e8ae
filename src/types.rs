//! Data types for catalog entities, scraped references and sync operations.
//!
//! This module contains the core data structures used throughout the crate:
//! catalog metadata (tracks, albums, artists, playlists), scraped media
//! references, error types, configuration, and client events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

// ================================================================================================
// CATALOG METADATA
// ================================================================================================

/// Public web links attached to a catalog entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrls {
    /// Link to the entity on the streaming service's web player
    #[serde(default)]
    pub spotify: Option<String>,
}

/// Cover art or profile image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
}

/// A catalog user (playlist owner or the authenticated account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl User {
    /// Display name if the account has one, otherwise the raw id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// An artist reference. Tracks and albums refer to artists, never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// An album reference with display metadata.
///
/// `release_date` is kept as the raw string because the catalog reports it
/// with varying precision (`"1997"`, `"1997-05"`, `"1997-05-21"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<u32>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// A catalog track.
///
/// `id` is the stable identity: reconciliation and deduplication are keyed
/// on it, never on the name or artist text. `uri` is the addressable form
/// that mutation endpoints take.
///
/// # Examples
///
/// ```rust
/// use tracklist_sync::{Album, Artist, ExternalUrls, Track};
///
/// let artist = Artist {
///     id: "4Z8W4fKeB5YxbusRsdQVPb".to_string(),
///     uri: "spotify:artist:4Z8W4fKeB5YxbusRsdQVPb".to_string(),
///     name: "Radiohead".to_string(),
///     external_urls: ExternalUrls::default(),
///     images: vec![],
/// };
/// let track = Track {
///     id: "6LgJvl0Xdtc73RJ1mmpotq".to_string(),
///     uri: "spotify:track:6LgJvl0Xdtc73RJ1mmpotq".to_string(),
///     name: "Paranoid Android".to_string(),
///     artists: vec![artist.clone()],
///     album: Album {
///         id: "6dVIqQ8qmQ5GBnJ9shOYGE".to_string(),
///         uri: "spotify:album:6dVIqQ8qmQ5GBnJ9shOYGE".to_string(),
///         name: "OK Computer".to_string(),
///         artists: vec![artist],
///         images: vec![],
///         release_date: Some("1997-05-21".to_string()),
///         total_tracks: Some(12),
///         external_urls: ExternalUrls::default(),
///     },
///     external_urls: ExternalUrls::default(),
/// };
///
/// assert_eq!(track.artist_names(), "Radiohead");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl Track {
    /// Comma separated artist names in credit order.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Web player link, if the catalog supplied one.
    pub fn url(&self) -> Option<&str> {
        self.external_urls.spotify.as_deref()
    }
}

/// The collection a [`ListEntry`] was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionRef {
    /// The user's saved tracks
    Library,
    /// A specific playlist, by id
    Playlist(String),
}

/// A track as it appears inside a collection, with the time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub track: Track,
    pub added_at: DateTime<Utc>,
    pub collection: CollectionRef,
}

impl ListEntry {
    pub fn new(track: Track, added_at: DateTime<Utc>, collection: CollectionRef) -> Self {
        Self {
            track,
            added_at,
            collection,
        }
    }

    /// Age of the entry relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.added_at)
    }
}

/// An album in the user's library with the time it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAlbum {
    pub album: Album,
    pub added_at: DateTime<Utc>,
}

/// A playlist header. Entries are listed separately through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub uri: String,
    pub name: String,
    /// The catalog reports `null` for playlists whose visibility is unknown
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: User,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl Playlist {
    pub fn is_public(&self) -> bool {
        self.public.unwrap_or(false)
    }
}

// ================================================================================================
// SCRAPED REFERENCES
// ================================================================================================

/// Parameters extracted from a tracklist's "open externally" action.
///
/// The pairs are kept in document order so the resolution request carries
/// them exactly as the page declared them. A reference is consumed by one
/// resolution call and not retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaReference {
    params: Vec<(String, String)>,
}

impl MediaReference {
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self { params }
    }

    /// Look up a parameter by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// URL-encoded query string (`k1=v1&k2=v2`).
    pub fn to_query(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// A set listing discovered on a curator's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    /// The site's internal id for the listing (`data-id`)
    pub id: Option<String>,
    /// Path of the listing page relative to the site root
    pub path: String,
}

// ================================================================================================
// ERROR TYPES
// ================================================================================================

/// Error types for sync operations.
///
/// Transport and parse errors propagate to the run-level caller; nothing in
/// the library rolls back mutations that were already sent.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use tracklist_sync::{CatalogClient, SyncError, SyncRunner};
///
/// async fn run<C: CatalogClient>(runner: &SyncRunner<C>) {
///     match runner.run().await {
///         Ok(report) => println!("{report}"),
///         Err(SyncError::Authorization(msg)) => eprintln!("Authorization rejected: {msg}"),
///         Err(SyncError::RateLimit { retry_after }) => {
///             eprintln!("Rate limited, retry in {retry_after} seconds");
///         }
///         Err(SyncError::Http(msg)) => eprintln!("Network error: {msg}"),
///         Err(e) => eprintln!("Run aborted: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network level failure.
    ///
    /// Connection failures, DNS errors, and body read failures.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code returned by the remote
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Explicit rate limiting (HTTP 429).
    ///
    /// The `retry_after` field carries the server's `Retry-After` hint in
    /// seconds, or a default when the header is missing.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimit {
        /// Number of seconds to wait before retrying
        retry_after: u64,
    },

    /// The authorization service rejected a refresh or code exchange.
    ///
    /// A rejected refresh is not fatal: the token manager falls back to the
    /// interactive flow.
    #[error("Authorization rejected: {0}")]
    Authorization(String),

    /// A protected call was attempted outside the `Authenticated` state.
    #[error("Not authorized (state: {0})")]
    NotAuthorized(AuthState),

    /// Failed to parse a response.
    ///
    /// Only raised for genuinely malformed payloads. Markup that simply lacks
    /// the expected elements is skipped, not reported.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}

// ================================================================================================
// AUTHORIZATION STATE
// ================================================================================================

/// Token lifecycle state.
///
/// ```text
/// Unauthenticated -> Authenticated -> Expired -> Reauthorizing -> Authenticated
/// ```
///
/// Protected catalog calls are only issued in `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    Expired,
    Reauthorizing,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Expired => write!(f, "expired"),
            AuthState::Reauthorizing => write!(f, "reauthorizing"),
        }
    }
}

// ================================================================================================
// CLIENT CONFIGURATION
// ================================================================================================

/// Minimum spacing between two requests to the same host.
///
/// Each wait is drawn uniformly from `[min_interval, max_interval]` so the
/// request pattern is not strictly periodic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::scraping()
    }
}

impl PacingConfig {
    /// 1.2 to 1.6 seconds between requests, used against the scrape target.
    pub fn scraping() -> Self {
        Self {
            min_interval: Duration::from_millis(1200),
            max_interval: Duration::from_millis(1600),
        }
    }

    /// No pacing at all.
    pub fn none() -> Self {
        Self {
            min_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
        }
    }

    /// Fixed interval without jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            min_interval: interval,
            max_interval: interval,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.max_interval.is_zero()
    }
}

/// Configuration for a [`RateLimitedTransport`](crate::RateLimitedTransport).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportConfig {
    /// Inter-request pacing per host
    pub pacing: PacingConfig,
    /// Send browser-like identity headers with every request
    pub browser_identity: bool,
    /// Page fetched once before the first request to obtain session cookies
    pub session_url: Option<String>,
    /// When set, text response bodies are saved here for debugging
    pub debug_dir: Option<PathBuf>,
}

impl TransportConfig {
    /// Paced, browser-identified transport with a session bootstrap page.
    pub fn scraping(session_url: impl Into<String>) -> Self {
        Self {
            pacing: PacingConfig::scraping(),
            browser_identity: true,
            session_url: Some(session_url.into()),
            debug_dir: None,
        }
    }

    /// Unpaced transport for the catalog API.
    pub fn api() -> Self {
        Self {
            pacing: PacingConfig::none(),
            browser_identity: false,
            session_url: None,
            debug_dir: None,
        }
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }
}

/// Server-imposed batch ceilings.
///
/// These are configuration, not protocol invariants; the defaults are the
/// values the catalog enforces today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Ids per save-to-library call
    pub library_mutation: usize,
    /// Uris per playlist add/remove call
    pub playlist_mutation: usize,
    /// Ids per bulk track lookup
    pub track_lookup: usize,
    /// Items requested per listing page
    pub page_size: u32,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            library_mutation: 50,
            playlist_mutation: 100,
            track_lookup: 50,
            page_size: 50,
        }
    }
}

/// Eviction rule for staging playlists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Entries older than this are moved into the library
    pub window: chrono::Duration,
    /// Only owned playlists whose name starts with this prefix are pruned
    pub playlist_prefix: String,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: chrono::Duration::weeks(2),
            playlist_prefix: "idk".to_string(),
        }
    }
}

impl RetentionPolicy {
    pub fn applies_to(&self, playlist: &Playlist) -> bool {
        playlist.name.starts_with(&self.playlist_prefix)
    }
}

/// Configuration for retry behavior on explicit rate limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (set to 0 to disable retries)
    pub max_retries: u32,
    /// Base delay for exponential backoff (in seconds)
    pub base_delay: u64,
    /// Maximum delay cap (in seconds)
    pub max_delay: u64,
    /// Whether retries are enabled at all
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 5,
            max_delay: 300,
            enabled: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with retries disabled
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            enabled: false,
            ..Default::default()
        }
    }

    /// Create a config with custom retry count
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            enabled: max_retries > 0,
            ..Default::default()
        }
    }
}

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of retry attempts made
    pub attempts_made: u32,
    /// Total time spent waiting between attempts (in seconds)
    pub total_retry_time: u64,
}

/// OAuth2 authorization-code client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub const DEFAULT_SCOPES: [&'static str; 4] = [
        "playlist-modify-public",
        "user-library-read",
        "user-library-modify",
        "user-follow-read",
    ];

    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
        }
    }

    /// Point both OAuth endpoints at another accounts host.
    pub fn with_accounts_base(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.authorize_url = format!("{base}/authorize");
        self.token_url = format!("{base}/api/token");
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("OAuth {name} is empty")));
            }
        }
        Ok(())
    }
}

/// A curator whose published tracklists feed one destination playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratorConfig {
    /// Curator slug as used in the site's URLs
    pub name: String,
    /// Playlist that collects everything discovered for this curator
    pub playlist_id: String,
}

impl CuratorConfig {
    pub fn new(name: impl Into<String>, playlist_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            playlist_id: playlist_id.into(),
        }
    }
}

/// Everything one sync run needs, passed explicitly to constructors.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub oauth: OAuthConfig,
    pub catalog_base_url: String,
    pub scrape_base_url: String,
    pub mirror_playlist_id: Option<String>,
    pub curators: Vec<CuratorConfig>,
    pub retention: RetentionPolicy,
    pub batch: BatchLimits,
    pub retry: RetryConfig,
    pub scrape_pacing: PacingConfig,
    /// Where the refresh credential is persisted; `None` uses the data dir
    pub credential_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            oauth,
            catalog_base_url: "https://api.spotify.com/v1".to_string(),
            scrape_base_url: "https://www.1001tracklists.com".to_string(),
            mirror_playlist_id: None,
            curators: Vec::new(),
            retention: RetentionPolicy::default(),
            batch: BatchLimits::default(),
            retry: RetryConfig::default(),
            scrape_pacing: PacingConfig::scraping(),
            credential_path: None,
        }
    }

    pub fn with_mirror_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.mirror_playlist_id = Some(playlist_id.into());
        self
    }

    pub fn with_curator(mut self, curator: CuratorConfig) -> Self {
        self.curators.push(curator);
        self
    }

    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        self.oauth.validate()?;
        if self.batch.library_mutation == 0
            || self.batch.playlist_mutation == 0
            || self.batch.track_lookup == 0
            || self.batch.page_size == 0
        {
            return Err(SyncError::Config(
                "batch limits must all be positive".to_string(),
            ));
        }
        if self.scrape_pacing.min_interval > self.scrape_pacing.max_interval {
            return Err(SyncError::Config(
                "pacing min_interval exceeds max_interval".to_string(),
            ));
        }
        Ok(())
    }
}

// ================================================================================================
// EVENT SYSTEM
// ================================================================================================

/// Request information for client events
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestInfo {
    /// The HTTP method (GET, POST, etc.)
    pub method: String,
    /// Host the request went to
    pub host: String,
    /// Path without query parameters
    pub path: String,
    /// Query parameters as key-value pairs
    pub query_params: Vec<(String, String)>,
}

impl RequestInfo {
    pub fn from_request(request: &http_types::Request) -> Self {
        let url = request.url();
        Self {
            method: request.method().to_string(),
            host: url.host_str().unwrap_or_default().to_string(),
            path: url.path().to_string(),
            query_params: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    /// Get a short description of the request for logging
    pub fn short_description(&self) -> String {
        let mut desc = format!("{} {}{}", self.method, self.host, self.path);
        if let Some((k, v)) = self.query_params.first() {
            desc.push_str(&format!("?{k}={v}"));
            if self.query_params.len() > 1 {
                desc.push_str("...");
            }
        }
        desc
    }
}

/// Event type to describe internal client activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Request dispatched
    RequestStarted {
        /// Request details
        request: RequestInfo,
    },
    /// Response received (any status)
    RequestCompleted {
        /// Request details
        request: RequestInfo,
        /// HTTP status code
        status_code: u16,
        /// Duration of the request in milliseconds
        duration_ms: u64,
    },
    /// The transport waited before dispatching to respect pacing
    Paced {
        /// Host being paced
        host: String,
        /// Time spent waiting in milliseconds
        delay_ms: u64,
    },
    /// An explicit rate limit was hit and the caller is backing off
    RateLimited {
        /// Duration to wait in seconds
        delay_seconds: u64,
        /// Operation that was rate limited
        operation: String,
    },
    /// One chunk of a mutation plan was sent
    MutationApplied {
        /// Short mutation name (`save`, `add`, `remove`)
        kind: String,
        /// Library or playlist id the mutation targeted
        target: String,
        /// Number of ids/uris in the chunk
        count: usize,
    },
}

/// Type alias for the broadcast receiver
pub type ClientEventReceiver = broadcast::Receiver<ClientEvent>;

/// Shared event broadcasting state that persists across client clones
#[derive(Clone)]
pub struct SharedEventBroadcaster {
    event_tx: broadcast::Sender<ClientEvent>,
    last_event_tx: watch::Sender<Option<ClientEvent>>,
}

impl SharedEventBroadcaster {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (last_event_tx, _) = watch::channel(None);

        Self {
            event_tx,
            last_event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event.clone());
        self.last_event_tx.send_replace(Some(event));
    }

    pub fn subscribe(&self) -> ClientEventReceiver {
        self.event_tx.subscribe()
    }

    pub fn latest_event(&self) -> Option<ClientEvent> {
        self.last_event_tx.borrow().clone()
    }
}

impl Default for SharedEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedEventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEventBroadcaster")
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}

// ================================================================================================
// TESTS
// ================================================================================================

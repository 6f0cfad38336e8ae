//! Catalog client over the streaming service's Web API.

use crate::auth::TokenManager;
use crate::catalog::CatalogClient;
use crate::headers;
use crate::iterator::{Page, PageRequest};
use crate::retry;
use crate::transport::{parse_url, RateLimitedTransport};
use crate::types::{
    Artist, AuthState, BatchLimits, ClientEvent, CollectionRef, ListEntry, Playlist, RetryConfig,
    SavedAlbum, Track, User,
};
use crate::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http_client::Request;
use http_types::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

// ================================================================================================
// RESPONSE ENVELOPES
// ================================================================================================

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Option<Vec<T>>,
    cursors: Option<Cursors>,
}

impl<T> Paging<T> {
    /// Convert the raw items, dropping those `convert` rejects. The page
    /// still reports every raw item as consumed so offsets stay aligned with
    /// the server's listing.
    fn into_page<U>(self, convert: impl FnMut(T) -> Option<U>) -> Page<U> {
        let after = self.cursors.and_then(|c| c.after);
        match self.items {
            Some(items) => {
                let consumed = items.len();
                Page::filtered(consumed, items.into_iter().filter_map(convert).collect())
                    .with_after(after)
            }
            None => Page::absent(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Cursors {
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowedArtists {
    #[serde(default)]
    artists: Option<Paging<Artist>>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackItem {
    added_at: DateTime<Utc>,
    track: Track,
}

#[derive(Debug, Deserialize)]
struct SavedAlbumItem {
    added_at: DateTime<Utc>,
    album: crate::types::Album,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_local: bool,
    #[serde(default)]
    track: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SeveralTracks {
    tracks: Vec<Option<Track>>,
}

/// Turn a raw playlist item into an entry, skipping anything without a
/// catalog id.
fn playlist_entry(item: PlaylistItem, playlist_id: &str) -> Option<ListEntry> {
    let value = item.track?;
    if item.is_local || value.get("id").map_or(true, Value::is_null) {
        log::debug!("Skipping playlist item without catalog id in {playlist_id}");
        return None;
    }
    if value.get("type").and_then(Value::as_str).is_some_and(|kind| kind != "track") {
        log::debug!("Skipping non-track item in {playlist_id}");
        return None;
    }

    match serde_json::from_value::<Track>(value) {
        Ok(track) => Some(ListEntry::new(
            track,
            item.added_at.unwrap_or_default(),
            CollectionRef::Playlist(playlist_id.to_string()),
        )),
        Err(e) => {
            log::debug!("Skipping unreadable playlist item in {playlist_id}: {e}");
            None
        }
    }
}

// ================================================================================================
// CLIENT
// ================================================================================================

/// [`CatalogClient`] backed by HTTP calls through a [`RateLimitedTransport`].
///
/// Every request carries a bearer token obtained from the shared
/// [`TokenManager`], so the client never issues a protected call outside
/// the `Authenticated` state. An HTTP 401 expires the token, and the request
/// is sent once more after reauthorization.
///
/// No other failure is retried unless the caller opts in with
/// [`with_retry`](Self::with_retry). With retries enabled, only HTTP 429 on
/// reads is retried; mutations are always sent exactly once.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tracklist_sync::{
///     AuthorizationPrompt, CatalogClient, CatalogClientImpl, MemoryCredentialStore, OAuthConfig,
///     RateLimitedTransport, TokenManager, TransportConfig,
/// };
///
/// struct Paste;
/// impl AuthorizationPrompt for Paste {
///     fn request_authorization(&self, url: &str) -> tracklist_sync::Result<String> {
///         println!("Open {url}");
///         Ok(String::new())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let transport = RateLimitedTransport::new(
///     Box::new(http_client::native::NativeClient::new()),
///     TransportConfig::api(),
/// );
/// let tokens = TokenManager::new(
///     OAuthConfig::new("id", "secret", "http://localhost:8888/callback"),
///     transport.clone(),
///     Arc::new(MemoryCredentialStore::default()),
///     Arc::new(Paste),
/// );
/// let client = CatalogClientImpl::new(transport, tokens, "https://api.spotify.com/v1");
/// client.authorize().await?;
/// println!("Hello {}", client.current_user().await?.name());
/// # Ok::<(), tracklist_sync::SyncError>(())
/// # });
/// ```
#[derive(Clone)]
pub struct CatalogClientImpl {
    transport: RateLimitedTransport,
    tokens: Arc<Mutex<TokenManager>>,
    base_url: String,
    limits: BatchLimits,
    retry: RetryConfig,
}

impl std::fmt::Debug for CatalogClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClientImpl")
            .field("base_url", &self.base_url)
            .field("limits", &self.limits)
            .finish()
    }
}

impl CatalogClientImpl {
    /// Create a client.
    ///
    /// # Arguments
    ///
    /// * `transport` - Transport used for API calls (normally unpaced)
    /// * `tokens` - Token manager that authorizes requests
    /// * `base_url` - API root such as `https://api.spotify.com/v1`
    pub fn new(transport: RateLimitedTransport, tokens: TokenManager, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            tokens: Arc::new(Mutex::new(tokens)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limits: BatchLimits::default(),
            retry: RetryConfig::disabled(),
        }
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Retry reads that were rate limited (HTTP 429).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Force the interactive flow, replacing any stored credential.
    pub async fn authorize_interactively(&self) -> Result<()> {
        self.tokens.lock().await.authorize_interactively().await
    }

    pub async fn auth_state(&self) -> AuthState {
        self.tokens.lock().await.state()
    }

    pub fn transport(&self) -> &RateLimitedTransport {
        &self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn bearer(&self) -> Result<String> {
        self.tokens.lock().await.access_token().await
    }

    /// One authorized request. A 401 expires the token and is retried once.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let url = self.url(path);
        let mut reauthorized = false;

        loop {
            let token = self.bearer().await?;
            let mut request = Request::new(method, parse_url(&url)?);
            headers::add_json_headers(&mut request);
            headers::add_bearer(&mut request, &token);
            if let Some(body) = body {
                request.set_body(body.to_string());
            }

            let response = self.transport.execute(request).await?;
            if response.status == 401 && !reauthorized {
                log::info!("Access token rejected by {url}; reauthorizing");
                self.tokens.lock().await.mark_expired();
                reauthorized = true;
                continue;
            }
            return Ok(response.error_for_status()?.body);
        }
    }

    /// GET with rate-limit retries.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let broadcaster = self.transport.broadcaster();
        let outcome = retry::retry_with_backoff(
            self.retry.clone(),
            path,
            || self.send(Method::Get, path, None),
            |delay, operation| {
                broadcaster.broadcast_event(ClientEvent::RateLimited {
                    delay_seconds: delay,
                    operation: operation.to_string(),
                });
            },
        )
        .await?;

        if outcome.attempts_made > 0 {
            log::debug!(
                "{path} succeeded after {} retries ({}s waiting)",
                outcome.attempts_made,
                outcome.total_retry_time
            );
        }
        serde_json::from_str(&outcome.result)
            .map_err(|e| SyncError::Parse(format!("invalid JSON from {path}: {e}")))
    }

    /// Mutation, sent exactly once.
    async fn mutate(&self, method: Method, path: &str, body: Value, kind: &str, target: &str, count: usize) -> Result<()> {
        self.send(method, path, Some(&body)).await?;
        log::debug!("Applied {kind} of {count} items to {target}");
        self.transport
            .broadcaster()
            .broadcast_event(ClientEvent::MutationApplied {
                kind: kind.to_string(),
                target: target.to_string(),
                count,
            });
        Ok(())
    }

    fn check_batch(&self, len: usize, ceiling: usize, what: &str) -> Result<()> {
        if len > ceiling {
            return Err(SyncError::Config(format!(
                "{what} batch of {len} exceeds the server ceiling of {ceiling}"
            )));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl CatalogClient for CatalogClientImpl {
    fn batch_limits(&self) -> BatchLimits {
        self.limits
    }

    async fn authorize(&self) -> Result<()> {
        self.tokens.lock().await.authorize().await
    }

    async fn current_user(&self) -> Result<User> {
        self.get("me").await
    }

    async fn saved_tracks_page(&self, request: PageRequest) -> Result<Page<ListEntry>> {
        let paging: Paging<SavedTrackItem> =
            self.get(&format!("me/tracks?{}", request.to_query())).await?;
        Ok(paging.into_page(|item| {
            Some(ListEntry::new(item.track, item.added_at, CollectionRef::Library))
        }))
    }

    async fn saved_albums_page(&self, request: PageRequest) -> Result<Page<SavedAlbum>> {
        let paging: Paging<SavedAlbumItem> =
            self.get(&format!("me/albums?{}", request.to_query())).await?;
        Ok(paging.into_page(|item| {
            Some(SavedAlbum {
                album: item.album,
                added_at: item.added_at,
            })
        }))
    }

    async fn followed_artists_page(&self, request: PageRequest) -> Result<Page<Artist>> {
        let followed: FollowedArtists = self
            .get(&format!("me/following?type=artist&{}", request.to_query()))
            .await?;
        Ok(match followed.artists {
            Some(paging) => paging.into_page(Some),
            None => Page::absent(),
        })
    }

    async fn user_playlists_page(&self, request: PageRequest) -> Result<Page<Playlist>> {
        let paging: Paging<Playlist> =
            self.get(&format!("me/playlists?{}", request.to_query())).await?;
        Ok(paging.into_page(Some))
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        request: PageRequest,
    ) -> Result<Page<ListEntry>> {
        let paging: Paging<PlaylistItem> = self
            .get(&format!(
                "playlists/{}/tracks?{}",
                urlencoding::encode(playlist_id),
                request.to_query()
            ))
            .await?;
        Ok(paging.into_page(|item| playlist_entry(item, playlist_id)))
    }

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        self.get(&format!("playlists/{}", urlencoding::encode(playlist_id)))
            .await
    }

    async fn tracks_by_ids(&self, ids: &[String]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.check_batch(ids.len(), self.limits.track_lookup, "lookup")?;

        let several: SeveralTracks = self
            .get(&format!(
                "tracks?ids={}",
                ids.iter()
                    .map(|id| urlencoding::encode(id).into_owned())
                    .collect::<Vec<_>>()
                    .join(",")
            ))
            .await?;
        let requested = ids.len();
        let tracks: Vec<Track> = several.tracks.into_iter().flatten().collect();
        if tracks.len() < requested {
            log::debug!("{} of {requested} ids are unknown to the catalog", requested - tracks.len());
        }
        Ok(tracks)
    }

    async fn save_tracks(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.check_batch(ids.len(), self.limits.library_mutation, "library save")?;
        self.mutate(Method::Put, "me/tracks", json!({ "ids": ids }), "save", "library", ids.len())
            .await
    }

    async fn add_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }
        self.check_batch(uris.len(), self.limits.playlist_mutation, "playlist add")?;
        let path = format!("playlists/{}/tracks", urlencoding::encode(playlist_id));
        self.mutate(Method::Post, &path, json!({ "uris": uris }), "add", playlist_id, uris.len())
            .await
    }

    async fn remove_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }
        self.check_batch(uris.len(), self.limits.playlist_mutation, "playlist remove")?;
        let tracks: Vec<Value> = uris.iter().map(|uri| json!({ "uri": uri })).collect();
        let path = format!("playlists/{}/tracks", urlencoding::encode(playlist_id));
        self.mutate(Method::Delete, &path, json!({ "tracks": tracks }), "remove", playlist_id, uris.len())
            .await
    }
}

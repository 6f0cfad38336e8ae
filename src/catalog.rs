use crate::chunk::Chunker;
use crate::iterator::{AsyncPaginatedIterator, CursorStrategy, Page, PageRequest, Paginator};
use crate::types::{Artist, BatchLimits, ListEntry, Playlist, SavedAlbum, Track, User};
use crate::Result;
use async_trait::async_trait;

/// Trait for streaming catalog operations that can be mocked for testing.
///
/// Page methods fetch exactly one page and know nothing about cursors; the
/// listing constructors in this module wrap them in a [`Paginator`] with the
/// cursor discipline each endpoint uses. Mutation methods take a single
/// batch that must already fit the server ceiling; callers batch through
/// [`Chunker`].
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockCatalogClient`
/// that implements this trait using the `mockall` library.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait CatalogClient {
    /// Batch ceilings and page size this client was configured with.
    fn batch_limits(&self) -> BatchLimits;

    /// Run the token lifecycle until protected calls are allowed.
    async fn authorize(&self) -> Result<()>;

    /// Profile of the authenticated user.
    async fn current_user(&self) -> Result<User>;

    /// One page of the user's saved tracks.
    async fn saved_tracks_page(&self, request: PageRequest) -> Result<Page<ListEntry>>;

    /// One page of the user's saved albums.
    async fn saved_albums_page(&self, request: PageRequest) -> Result<Page<SavedAlbum>>;

    /// One page of followed artists. Uses the `after` cursor.
    async fn followed_artists_page(&self, request: PageRequest) -> Result<Page<Artist>>;

    /// One page of the user's playlists (owned and followed).
    async fn user_playlists_page(&self, request: PageRequest) -> Result<Page<Playlist>>;

    /// One page of a playlist's entries.
    ///
    /// Entries without a catalog id (local files, removed tracks, podcast
    /// episodes) are dropped from the page.
    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        request: PageRequest,
    ) -> Result<Page<ListEntry>>;

    /// Playlist header by id.
    async fn playlist(&self, playlist_id: &str) -> Result<Playlist>;

    /// Bulk lookup of at most `track_lookup` ids. Unknown ids are omitted.
    async fn tracks_by_ids(&self, ids: &[String]) -> Result<Vec<Track>>;

    /// Save at most `library_mutation` tracks to the library.
    async fn save_tracks(&self, ids: &[String]) -> Result<()>;

    /// Append at most `playlist_mutation` uris to a playlist.
    async fn add_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;

    /// Remove every occurrence of at most `playlist_mutation` uris.
    async fn remove_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;
}

/// Saved tracks in the order the catalog returns them (most recent first).
pub fn saved_tracks<'a, C: CatalogClient + ?Sized>(
    client: &'a C,
    limit: Option<usize>,
) -> Box<dyn AsyncPaginatedIterator<ListEntry> + 'a> {
    let page_size = client.batch_limits().page_size;
    Box::new(
        Paginator::new(CursorStrategy::Offset, page_size, move |request| {
            client.saved_tracks_page(request)
        })
        .with_limit(limit),
    )
}

/// Saved albums, most recent first.
pub fn saved_albums<'a, C: CatalogClient + ?Sized>(
    client: &'a C,
    limit: Option<usize>,
) -> Box<dyn AsyncPaginatedIterator<SavedAlbum> + 'a> {
    let page_size = client.batch_limits().page_size;
    Box::new(
        Paginator::new(CursorStrategy::Offset, page_size, move |request| {
            client.saved_albums_page(request)
        })
        .with_limit(limit),
    )
}

/// Followed artists, walked with the opaque `after` cursor.
pub fn followed_artists<'a, C: CatalogClient + ?Sized>(
    client: &'a C,
    limit: Option<usize>,
) -> Box<dyn AsyncPaginatedIterator<Artist> + 'a> {
    let page_size = client.batch_limits().page_size;
    Box::new(
        Paginator::new(CursorStrategy::After, page_size, move |request| {
            client.followed_artists_page(request)
        })
        .with_limit(limit),
    )
}

/// Playlists owned or followed by the current user.
pub fn user_playlists<'a, C: CatalogClient + ?Sized>(
    client: &'a C,
    limit: Option<usize>,
) -> Box<dyn AsyncPaginatedIterator<Playlist> + 'a> {
    let page_size = client.batch_limits().page_size;
    Box::new(
        Paginator::new(CursorStrategy::Offset, page_size, move |request| {
            client.user_playlists_page(request)
        })
        .with_limit(limit),
    )
}

/// Entries of one playlist in playlist order.
pub fn playlist_tracks<'a, C: CatalogClient + ?Sized>(
    client: &'a C,
    playlist_id: &'a str,
    limit: Option<usize>,
) -> Box<dyn AsyncPaginatedIterator<ListEntry> + 'a> {
    let page_size = client.batch_limits().page_size;
    Box::new(
        Paginator::new(CursorStrategy::Offset, page_size, move |request| {
            client.playlist_tracks_page(playlist_id, request)
        })
        .with_limit(limit),
    )
}

/// Resolve any number of ids, batching lookups under the server ceiling.
///
/// Results keep the order of `ids`; ids the catalog does not know are
/// dropped.
pub async fn lookup_tracks<C: CatalogClient + ?Sized>(client: &C, ids: &[String]) -> Result<Vec<Track>> {
    let mut tracks = Vec::with_capacity(ids.len());
    for batch in Chunker::new(ids.iter().cloned(), client.batch_limits().track_lookup)? {
        log::debug!("Looking up {} tracks", batch.len());
        tracks.extend(client.tracks_by_ids(&batch).await?);
    }
    Ok(tracks)
}

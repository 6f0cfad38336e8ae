pub mod api;
pub mod auth;
pub mod catalog;
pub mod chunk;
pub mod credential_store;
pub mod headers;
pub mod iterator;
pub mod reconcile;
pub mod retry;
pub mod sync;
pub mod tracklists;
pub mod transport;
pub mod types;

pub use api::CatalogClientImpl;
pub use auth::{extract_authorization_code, AuthorizationPrompt, TokenManager};
pub use catalog::{
    followed_artists, lookup_tracks, playlist_tracks, saved_albums, saved_tracks, user_playlists,
    CatalogClient,
};
pub use chunk::Chunker;
pub use credential_store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use iterator::{AsyncPaginatedIterator, CursorStrategy, Page, PageRequest, Paginator};
pub use reconcile::{Mutation, MutationPlan, RetentionPlan};
pub use sync::{SyncReport, SyncRunner};
pub use tracklists::{ListingStrategy, TracklistParser, TracklistScraper};
pub use transport::{RateLimitedTransport, TransportResponse};
pub use types::{
    Album, Artist, AuthState, BatchLimits, ClientEvent, ClientEventReceiver, CollectionRef,
    CuratorConfig, ExternalUrls, Image, ListEntry, ListingRef, MediaReference, OAuthConfig,
    PacingConfig, Playlist, RequestInfo, RetentionPolicy, RetryConfig, RetryResult, SavedAlbum,
    SharedEventBroadcaster, SyncConfig, SyncError, Track, TransportConfig, User,
};

#[cfg(feature = "mock")]
pub use catalog::MockCatalogClient;

// Re-export scraper types for testing
pub use scraper::Html;

pub type Result<T> = std::result::Result<T, SyncError>;

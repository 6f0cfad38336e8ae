//! Scraper for curator tracklists published on 1001tracklists.
//!
//! The site has no API. Tracks are discovered by crawling a curator's
//! listings, reading each listing's "open in Spotify" actions and resolving
//! them through the site's media-link endpoint. All requests go through a
//! paced [`RateLimitedTransport`] that carries a browser identity and the
//! session cookie obtained from the landing page.

pub mod iterator;
pub mod parsing;

pub use iterator::{ListingIterator, TrackIdIterator};
pub use parsing::{CuratorPage, MediaLayout, OverviewChunk, TracklistParser};

use crate::transport::RateLimitedTransport;
use crate::types::{ListingRef, MediaReference};
use crate::Result;

/// Rows requested per incremental listing call.
pub const OVERVIEW_BATCH: u32 = 100;

/// How the crawl advances past the first page of listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingStrategy {
    /// Incremental-load POSTs carrying the last seen listing id and position
    #[default]
    Ajax,
    /// Numbered static index pages (`index.html`, `index2.html`, ...)
    Indexed,
}

impl ListingStrategy {
    pub fn layout(&self) -> MediaLayout {
        match self {
            ListingStrategy::Ajax => MediaLayout::MediaRows,
            ListingStrategy::Indexed => MediaLayout::TrackItems,
        }
    }
}

/// Client for the tracklist site.
///
/// # Examples
///
/// ```rust,no_run
/// use tracklist_sync::{AsyncPaginatedIterator, RateLimitedTransport, TracklistScraper, TransportConfig};
///
/// # tokio_test::block_on(async {
/// let base = "https://www.1001tracklists.com";
/// let transport = RateLimitedTransport::new(
///     Box::new(http_client::native::NativeClient::new()),
///     TransportConfig::scraping(base),
/// );
/// let scraper = TracklistScraper::new(transport, base);
///
/// let mut ids = scraper.track_ids("missmonique");
/// while let Some(id) = ids.next().await? {
///     println!("{id}");
/// }
/// # Ok::<(), tracklist_sync::SyncError>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TracklistScraper {
    transport: RateLimitedTransport,
    base_url: String,
    parser: TracklistParser,
    strategy: ListingStrategy,
}

impl TracklistScraper {
    pub fn new(transport: RateLimitedTransport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            parser: TracklistParser::new(),
            strategy: ListingStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ListingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> ListingStrategy {
        self.strategy
    }

    pub fn parser(&self) -> &TracklistParser {
        &self.parser
    }

    /// Listings published by `curator`, newest first.
    pub fn listings(&self, curator: &str) -> ListingIterator {
        ListingIterator::new(self.clone(), curator)
    }

    /// Resolved track ids for `curator`, oldest listing and oldest
    /// selection first.
    ///
    /// The sequence is consumed once; calling this again re-crawls.
    pub fn track_ids(&self, curator: &str) -> TrackIdIterator {
        TrackIdIterator::new(self.clone(), curator)
    }

    pub fn curator_url(&self, curator: &str) -> String {
        format!("{}/dj/{}/", self.base_url, urlencoding::encode(curator))
    }

    pub fn index_url(&self, curator: &str, page: u32) -> String {
        let index = if page > 1 {
            format!("index{page}.html")
        } else {
            "index.html".to_string()
        };
        format!("{}{index}", self.curator_url(curator))
    }

    /// Absolute URL for a listing link as found in the markup.
    pub fn listing_url(&self, listing: &ListingRef) -> String {
        if listing.path.starts_with("http://") || listing.path.starts_with("https://") {
            listing.path.clone()
        } else {
            format!("{}/{}", self.base_url, listing.path.trim_start_matches('/'))
        }
    }

    pub(crate) async fn fetch_page(&self, url: &str, referer: Option<&str>) -> Result<String> {
        self.transport.get_text(url, false, referer).await
    }

    /// Request the next batch of listings after `last_id`.
    pub(crate) async fn fetch_overview(
        &self,
        curator: &str,
        curator_id: &str,
        position: u32,
        last_id: &str,
    ) -> Result<OverviewChunk> {
        let url = format!("{}/ajax/get_data.php", self.base_url);
        let form = [
            ("type", "overview".to_string()),
            ("dj", curator_id.to_string()),
            ("pos", position.to_string()),
            ("id", last_id.to_string()),
            ("count", OVERVIEW_BATCH.to_string()),
        ];
        let referer = self.curator_url(curator);
        let body = self.transport.post_form(&url, &form, Some(&referer)).await?;
        self.parser.parse_overview_response(&body)
    }

    /// Fetch a listing page and extract its media references.
    pub async fn media_references(&self, listing: &ListingRef) -> Result<Vec<MediaReference>> {
        let url = self.listing_url(listing);
        let html = self.fetch_page(&url, Some(&self.base_url)).await?;
        Ok(self.parser.parse_media_rows(&html, self.strategy.layout()))
    }

    /// Resolve one media reference to a catalog track id.
    ///
    /// Returns `None` when the site knows no playable track for it.
    pub async fn resolve(&self, media: &MediaReference) -> Result<Option<String>> {
        let url = format!("{}/ajax/get_medialink.php?{}", self.base_url, media.to_query());
        let body = self.transport.get_text(&url, true, Some(&self.base_url)).await?;
        let player_id = self.parser.parse_medialink(&body)?;
        if player_id.is_none() {
            log::debug!("No playable track for media reference {:?}", media.params());
        }
        Ok(player_id)
    }
}

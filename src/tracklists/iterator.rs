use super::{ListingStrategy, OverviewChunk, TracklistScraper};
use crate::iterator::AsyncPaginatedIterator;
use crate::types::{ListingRef, MediaReference};
use crate::Result;

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CrawlState {
    /// Landing page not fetched yet
    Start,
    /// Advancing through incremental-load calls
    Ajax {
        curator_id: String,
        position: u32,
        last_id: String,
    },
    /// Advancing through numbered index pages
    Indexed { next_page: u32, last_page: u32 },
    Done,
}

/// Crawl of a curator's listings, newest first.
///
/// Stops on an explicit end marker or on a page that contains no listing
/// it has not already yielded. Listings are keyed on their path, and a
/// listing the site serves twice is yielded once.
pub struct ListingIterator {
    scraper: TracklistScraper,
    curator: String,
    state: CrawlState,
    buffer: VecDeque<ListingRef>,
    seen: HashSet<String>,
    pages_fetched: u32,
    total_pages: Option<u32>,
}

#[async_trait(?Send)]
impl AsyncPaginatedIterator<ListingRef> for ListingIterator {
    async fn next(&mut self) -> Result<Option<ListingRef>> {
        loop {
            if let Some(listing) = self.buffer.pop_front() {
                return Ok(Some(listing));
            }
            if self.state == CrawlState::Done {
                return Ok(None);
            }
            self.advance().await?;
        }
    }

    fn current_page(&self) -> u32 {
        self.pages_fetched
    }

    fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }
}

impl ListingIterator {
    pub fn new(scraper: TracklistScraper, curator: &str) -> Self {
        Self {
            scraper,
            curator: curator.to_string(),
            state: CrawlState::Start,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            pages_fetched: 0,
            total_pages: None,
        }
    }

    /// Buffer the listings not yielded before; returns how many were new.
    fn admit(&mut self, listings: Vec<ListingRef>) -> usize {
        let before = self.buffer.len();
        for listing in listings {
            if self.seen.insert(listing.path.clone()) {
                self.buffer.push_back(listing);
            } else {
                log::debug!("Skipping repeated listing {}", listing.path);
            }
        }
        self.buffer.len() - before
    }

    /// Fetch one more page of listings and update the crawl state.
    async fn advance(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, CrawlState::Done);
        self.state = match state {
            CrawlState::Start => match self.scraper.strategy() {
                ListingStrategy::Ajax => self.start_ajax().await?,
                ListingStrategy::Indexed => self.start_indexed().await?,
            },
            CrawlState::Ajax {
                curator_id,
                position,
                last_id,
            } => self.advance_ajax(curator_id, position, last_id).await?,
            CrawlState::Indexed {
                next_page,
                last_page,
            } => self.advance_indexed(next_page, last_page).await?,
            CrawlState::Done => CrawlState::Done,
        };
        Ok(())
    }

    async fn start_ajax(&mut self) -> Result<CrawlState> {
        let url = self.scraper.curator_url(&self.curator);
        let html = self.scraper.fetch_page(&url, None).await?;
        self.pages_fetched += 1;

        let page = self.scraper.parser().parse_curator_page(&html);
        log::info!(
            "Curator {} has {} listings on the first page",
            self.curator,
            page.listings.len()
        );

        let Some(curator_id) = page.curator_id else {
            log::warn!(
                "No curator id found for {}; only the first page is crawled",
                self.curator
            );
            self.admit(page.listings);
            return Ok(CrawlState::Done);
        };
        Ok(self.continue_ajax(curator_id, 0, page.listings))
    }

    async fn advance_ajax(
        &mut self,
        curator_id: String,
        position: u32,
        last_id: String,
    ) -> Result<CrawlState> {
        log::debug!("Loading listings of {} from position {position}", self.curator);
        let chunk = self
            .scraper
            .fetch_overview(&self.curator, &curator_id, position, &last_id)
            .await?;
        self.pages_fetched += 1;

        match chunk {
            OverviewChunk::End => {
                log::debug!("Listing crawl of {} reached the end marker", self.curator);
                Ok(CrawlState::Done)
            }
            OverviewChunk::Fragment(html) => {
                let listings = self.scraper.parser().parse_listing_fragment(&html);
                Ok(self.continue_ajax(curator_id, position, listings))
            }
        }
    }

    fn continue_ajax(
        &mut self,
        curator_id: String,
        position: u32,
        listings: Vec<ListingRef>,
    ) -> CrawlState {
        let last_id = listings.iter().rev().find_map(|l| l.id.clone());
        let found = listings.len() as u32;
        let fresh = self.admit(listings);

        match last_id {
            Some(last_id) if fresh > 0 => CrawlState::Ajax {
                curator_id,
                position: position + found,
                last_id,
            },
            _ => {
                log::debug!("No further listings for {}", self.curator);
                CrawlState::Done
            }
        }
    }

    async fn start_indexed(&mut self) -> Result<CrawlState> {
        let url = self.scraper.index_url(&self.curator, 1);
        let html = self.scraper.fetch_page(&url, None).await?;
        self.pages_fetched += 1;

        let parser = self.scraper.parser();
        let last_page = parser.parse_index_page_count(&html);
        let listings = parser.parse_index_listings(&html);
        self.total_pages = Some(last_page);
        log::info!("Curator {} has {last_page} index pages", self.curator);

        if self.admit(listings) == 0 {
            return Ok(CrawlState::Done);
        }
        Ok(CrawlState::Indexed {
            next_page: 2,
            last_page,
        })
    }

    async fn advance_indexed(&mut self, next_page: u32, last_page: u32) -> Result<CrawlState> {
        if next_page > last_page {
            return Ok(CrawlState::Done);
        }

        let url = self.scraper.index_url(&self.curator, next_page);
        let referer = self.scraper.index_url(&self.curator, next_page - 1);
        let html = self.scraper.fetch_page(&url, Some(&referer)).await?;
        self.pages_fetched += 1;

        let listings = self.scraper.parser().parse_index_listings(&html);
        log::debug!("Index page {next_page}: {} listings", listings.len());
        if self.admit(listings) == 0 {
            return Ok(CrawlState::Done);
        }
        Ok(CrawlState::Indexed {
            next_page: next_page + 1,
            last_page,
        })
    }
}

/// Resolved track ids for a curator in chronological order.
///
/// The full listing crawl is materialized before the first listing page is
/// read, because the site publishes newest first and ids are yielded oldest
/// first. Listing pages and resolutions are then fetched lazily.
pub struct TrackIdIterator {
    scraper: TracklistScraper,
    listings: ListingIterator,
    queue: Option<VecDeque<ListingRef>>,
    pending: VecDeque<MediaReference>,
    listings_read: u32,
}

#[async_trait(?Send)]
impl AsyncPaginatedIterator<String> for TrackIdIterator {
    async fn next(&mut self) -> Result<Option<String>> {
        if self.queue.is_none() {
            let mut listings = self.listings.collect_all().await?;
            listings.reverse();
            log::info!("Discovered {} listings", listings.len());
            self.queue = Some(listings.into());
        }

        loop {
            if let Some(media) = self.pending.pop_front() {
                match self.scraper.resolve(&media).await? {
                    Some(id) => return Ok(Some(id)),
                    None => continue,
                }
            }

            let Some(listing) = self.queue.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            log::info!("Pulling list {}", listing.path);
            self.pending = self.scraper.media_references(&listing).await?.into();
            self.listings_read += 1;
        }
    }

    fn current_page(&self) -> u32 {
        self.listings_read
    }

    fn total_pages(&self) -> Option<u32> {
        self.queue
            .as_ref()
            .map(|queue| self.listings_read + queue.len() as u32)
    }
}

impl TrackIdIterator {
    pub fn new(scraper: TracklistScraper, curator: &str) -> Self {
        Self {
            listings: ListingIterator::new(scraper.clone(), curator),
            scraper,
            queue: None,
            pending: VecDeque::new(),
            listings_read: 0,
        }
    }
}

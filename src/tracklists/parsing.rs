//! Markup parsing for tracklist pages.
//!
//! These functions are pure: they take page or fragment text and return
//! structured data. Missing elements are never errors here; a page without
//! the expected markup simply yields nothing.

use crate::types::{ListingRef, MediaReference};
use crate::{Result, SyncError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Prefix of the curator short link that carries the internal curator id.
const SHORT_LINK_PREFIX: &str = "https://1001.tl/";

/// Template of the inline handler that opens a track in an external player.
const MEDIA_VIEWER_PATTERN: &str = r"new MediaViewer\(this, .*, \{(.*)\} \);";

/// Markup flavour of a tracklist page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLayout {
    /// Current layout: `.mediaRow` rows with `.fa-spotify.mAction` buttons
    MediaRows,
    /// Older static layout: `.tlpItem` rows with `.fa-spotify.mediaAction`
    TrackItems,
}

impl MediaLayout {
    fn row_selector(&self) -> &'static str {
        match self {
            MediaLayout::MediaRows => ".mediaRow",
            MediaLayout::TrackItems => ".tlpItem",
        }
    }

    fn action_selector(&self) -> &'static str {
        match self {
            MediaLayout::MediaRows => ".fa-spotify.mAction",
            MediaLayout::TrackItems => ".fa-spotify.mediaAction",
        }
    }
}

/// Curator landing page contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CuratorPage {
    /// Internal id used by the incremental listing endpoint
    pub curator_id: Option<String>,
    /// First batch of listings, newest first
    pub listings: Vec<ListingRef>,
}

/// Response of the incremental listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverviewChunk {
    /// The source has no more listings
    End,
    /// An HTML fragment with the next listing rows
    Fragment(String),
}

/// Stateless parser for curator, listing and resolution responses.
#[derive(Debug, Clone)]
pub struct TracklistParser {
    media_viewer: Regex,
}

impl Default for TracklistParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TracklistParser {
    pub fn new() -> Self {
        Self {
            media_viewer: Regex::new(MEDIA_VIEWER_PATTERN).unwrap(),
        }
    }

    /// Parse the curator landing page: internal id plus first listings.
    pub fn parse_curator_page(&self, html: &str) -> CuratorPage {
        let document = Html::parse_document(html);

        let link_selector = Selector::parse("#left a[href]").unwrap();
        let curator_id = document
            .select(&link_selector)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| href.strip_prefix(SHORT_LINK_PREFIX))
            .map(|id| id.trim_end_matches('/').to_string())
            .filter(|id| !id.is_empty())
            .last();

        let middle_selector = Selector::parse("#middle").unwrap();
        let listings = match document.select(&middle_selector).next() {
            Some(middle) => self.listing_rows(middle),
            None => {
                log::debug!("Curator page has no #middle column");
                Vec::new()
            }
        };

        log::debug!(
            "Curator page: id {:?}, {} listings",
            curator_id,
            listings.len()
        );
        CuratorPage {
            curator_id,
            listings,
        }
    }

    /// Parse the listing rows of an incremental-load fragment.
    pub fn parse_listing_fragment(&self, html: &str) -> Vec<ListingRef> {
        let fragment = Html::parse_fragment(html);
        self.listing_rows(fragment.root_element())
    }

    /// Decode the incremental listing endpoint's JSON envelope.
    pub fn parse_overview_response(&self, body: &str) -> Result<OverviewChunk> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SyncError::Parse(format!("invalid listing response: {e}")))?;

        if value.get("end").map_or(false, is_truthy) {
            return Ok(OverviewChunk::End);
        }
        match value.get("data").and_then(Value::as_str) {
            Some(fragment) => Ok(OverviewChunk::Fragment(fragment.to_string())),
            None => {
                log::debug!("Listing response has neither end flag nor data");
                Ok(OverviewChunk::End)
            }
        }
    }

    /// Number of numbered pages on a static index page.
    ///
    /// The pagination list carries a "previous" and a "next" item besides
    /// the page numbers.
    pub fn parse_index_page_count(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        let item_selector = Selector::parse(".pagination li").unwrap();
        let items = document.select(&item_selector).count() as u32;
        items.saturating_sub(2).max(1)
    }

    /// Listing links on a static index page, newest first.
    pub fn parse_index_listings(&self, html: &str) -> Vec<ListingRef> {
        let document = Html::parse_document(html);
        let link_selector = Selector::parse("div.tlLink a[href]").unwrap();

        document
            .select(&link_selector)
            .filter_map(|link| link.value().attr("href"))
            .map(|href| ListingRef {
                id: None,
                path: href.to_string(),
            })
            .collect()
    }

    /// Media references on a listing page, in reverse document order.
    ///
    /// Rows without a share action, or whose action does not match the
    /// expected template, are skipped.
    pub fn parse_media_rows(&self, html: &str, layout: MediaLayout) -> Vec<MediaReference> {
        let document = Html::parse_document(html);
        let row_selector = Selector::parse(layout.row_selector()).unwrap();
        let action_selector = Selector::parse(layout.action_selector()).unwrap();

        let rows: Vec<ElementRef> = document.select(&row_selector).collect();
        let total = rows.len();

        let references: Vec<MediaReference> = rows
            .into_iter()
            .rev()
            .filter_map(|row| {
                let action = row.select(&action_selector).next()?;
                let onclick = action.value().attr("onclick")?;
                self.parse_media_payload(onclick)
            })
            .collect();

        log::debug!(
            "Found {} media references in {} rows",
            references.len(),
            total
        );
        references
    }

    /// Extract the parameter payload from a `MediaViewer` handler.
    ///
    /// `new MediaViewer(this, 'tlp_1', {idObject: '5', idItem: '123'} );`
    /// becomes `[("idObject", "5"), ("idItem", "123")]`. Returns `None` when
    /// the handler does not match the template or carries no pairs.
    pub fn parse_media_payload(&self, onclick: &str) -> Option<MediaReference> {
        let payload = self
            .media_viewer
            .captures_iter(onclick)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str())
            .find(|payload| !payload.is_empty())?;

        let params: Vec<(String, String)> = payload
            .replace('\'', "")
            .split(',')
            .filter_map(|pair| {
                let mut parts = pair.split(':');
                let key = parts.next()?.trim();
                let value = parts.next()?.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.to_string()))
            })
            .collect();

        if params.is_empty() {
            None
        } else {
            Some(MediaReference::new(params))
        }
    }

    /// First playable id from a media-link response (`data[0].playerId`).
    pub fn parse_medialink(&self, body: &str) -> Result<Option<String>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SyncError::Parse(format!("invalid media link response: {e}")))?;

        let player_id = value
            .get("data")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("playerId"))
            .and_then(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Ok(player_id)
    }

    fn listing_rows(&self, scope: ElementRef) -> Vec<ListingRef> {
        let row_selector = Selector::parse(".bItm, .action, .oItm").unwrap();
        let link_selector = Selector::parse(".bTitle a[href]").unwrap();

        scope
            .select(&row_selector)
            .filter_map(|row| {
                let id = row.value().attr("data-id")?;
                let link = row.select(&link_selector).next()?;
                let href = link.value().attr("href")?;
                Some(ListingRef {
                    id: Some(id.to_string()),
                    path: href.to_string(),
                })
            })
            .collect()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

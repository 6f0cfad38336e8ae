use crate::Result;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;

/// Async iterator trait for paginated and lazily resolved data.
///
/// Catalog listings, scraped listings and resolved track ids all implement
/// this trait. Iteration is pull-based: a page is only requested when the
/// buffer of the previous one has been drained.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait(?Send)]
pub trait AsyncPaginatedIterator<T> {
    /// Fetch the next item from the iterator.
    ///
    /// This method automatically handles pagination, fetching new pages as needed.
    /// Returns `None` when there are no more items available.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))` - Next item in the sequence
    /// - `Ok(None)` - No more items available
    /// - `Err(...)` - Network or parsing error occurred
    async fn next(&mut self) -> Result<Option<T>>;

    /// Collect all remaining items into a Vec.
    ///
    /// **Warning**: This method will fetch ALL remaining pages. Use
    /// [`take`](Self::take) for bounded collection.
    async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Take up to n items from the iterator.
    ///
    /// # Arguments
    ///
    /// * `n` - Maximum number of items to collect
    async fn take(&mut self, n: usize) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for _ in 0..n {
            match self.next().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Number of pages fetched so far.
    fn current_page(&self) -> u32;

    /// Get the total number of pages, if known.
    fn total_pages(&self) -> Option<u32> {
        None
    }
}

/// How successive pages are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStrategy {
    /// Numeric offset equal to the number of server items already consumed
    Offset,
    /// Opaque token taken from the previous page
    After,
}

/// Parameters for one page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of items to request, never above the page size cap
    pub limit: u32,
    /// Set under [`CursorStrategy::Offset`]
    pub offset: Option<u32>,
    /// Set under [`CursorStrategy::After`] once a token has been seen
    pub after: Option<String>,
}

impl PageRequest {
    /// Request for the first page.
    pub fn first(limit: u32) -> Self {
        Self {
            limit,
            offset: Some(0),
            after: None,
        }
    }

    /// Query string fragment for this request (`limit=..&offset=..`).
    pub fn to_query(&self) -> String {
        let mut query = format!("limit={}", self.limit);
        if let Some(offset) = self.offset {
            query.push_str(&format!("&offset={offset}"));
        }
        if let Some(after) = &self.after {
            query.push_str(&format!("&after={}", urlencoding::encode(after)));
        }
        query
    }
}

/// One fetched page.
///
/// A page signals exhaustion in one of three ways: `items` is `None` (the
/// list key was absent), the server returned no items at all, or `end` is
/// set. Items of a page marked `end` are still yielded.
///
/// `consumed` counts the items the server returned, before any were
/// filtered out. Offsets advance by it, so a page whose items were all
/// filtered away is not mistaken for the end of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Option<Vec<T>>,
    pub consumed: usize,
    /// Continuation token for [`CursorStrategy::After`]
    pub next_after: Option<String>,
    pub end: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            consumed: items.len(),
            items: Some(items),
            next_after: None,
            end: false,
        }
    }

    /// A page built from `consumed` server items of which only `items` were kept.
    pub fn filtered(consumed: usize, items: Vec<T>) -> Self {
        Self {
            items: Some(items),
            consumed,
            next_after: None,
            end: false,
        }
    }

    /// A page whose list key was missing from the response.
    pub fn absent() -> Self {
        Self {
            items: None,
            consumed: 0,
            next_after: None,
            end: true,
        }
    }

    pub fn with_after(mut self, after: Option<String>) -> Self {
        self.next_after = after;
        self
    }

    pub fn with_end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }
}

/// Generic lazy paginator over a page-fetching closure.
///
/// Guarantees:
/// - with a limit of `K`, no more than `K` items are yielded and no page
///   is requested once `K` items have been yielded;
/// - every request asks for `min(page_size, K - yielded)` items;
/// - the offset of a request equals the number of server items consumed so
///   far, which can exceed the number yielded when pages were filtered;
/// - after exhaustion `next` keeps returning `Ok(None)` without fetching.
///
/// Exhaustion under the offset strategy is only discovered by fetching an
/// empty page, so an unbounded walk costs one request past the last item.
pub struct Paginator<T, F> {
    fetch: F,
    strategy: CursorStrategy,
    page_size: u32,
    limit: Option<usize>,
    yielded: usize,
    offset: usize,
    buffer: VecDeque<T>,
    after: Option<String>,
    pages_fetched: u32,
    finished: bool,
}

#[async_trait(?Send)]
impl<T, F, Fut> AsyncPaginatedIterator<T> for Paginator<T, F>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    async fn next(&mut self) -> Result<Option<T>> {
        if self.reached_limit() {
            self.finished = true;
            self.buffer.clear();
            return Ok(None);
        }

        while self.buffer.is_empty() && !self.finished {
            self.fetch_page().await?;
        }

        match self.buffer.pop_front() {
            Some(item) => {
                self.yielded += 1;
                Ok(Some(item))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    fn current_page(&self) -> u32 {
        self.pages_fetched
    }
}

impl<T, F, Fut> Paginator<T, F>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    /// Create a paginator.
    ///
    /// # Arguments
    ///
    /// * `strategy` - Offset or continuation-token addressing
    /// * `page_size` - Server maximum items per page
    /// * `fetch` - Closure that performs one page request
    pub fn new(strategy: CursorStrategy, page_size: u32, fetch: F) -> Self {
        Self {
            fetch,
            strategy,
            page_size: page_size.max(1),
            limit: None,
            yielded: 0,
            offset: 0,
            buffer: VecDeque::new(),
            after: None,
            pages_fetched: 0,
            finished: false,
        }
    }

    /// Stop after `limit` items; `None` means unbounded.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn reached_limit(&self) -> bool {
        matches!(self.limit, Some(limit) if self.yielded >= limit)
    }

    fn next_request(&self) -> PageRequest {
        let remaining = self
            .limit
            .map(|limit| limit.saturating_sub(self.yielded))
            .unwrap_or(usize::MAX);
        let limit = (self.page_size as usize).min(remaining) as u32;

        match self.strategy {
            CursorStrategy::Offset => PageRequest {
                limit,
                offset: Some(self.offset as u32),
                after: None,
            },
            CursorStrategy::After => PageRequest {
                limit,
                offset: None,
                after: self.after.clone(),
            },
        }
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let request = self.next_request();
        log::trace!("Fetching page {} with {:?}", self.pages_fetched + 1, request);

        let page = (self.fetch)(request).await?;
        self.pages_fetched += 1;
        self.offset += page.consumed;

        if page.end {
            self.finished = true;
        }
        if self.strategy == CursorStrategy::After {
            match page.next_after {
                Some(after) => self.after = Some(after),
                None => self.finished = true,
            }
        }

        match page.items {
            Some(items) if page.consumed > 0 => self.buffer.extend(items),
            _ => self.finished = true,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn offset_source(
        total: u32,
        log: Rc<RefCell<Vec<PageRequest>>>,
    ) -> impl FnMut(PageRequest) -> std::future::Ready<Result<Page<u32>>> {
        move |req: PageRequest| {
            log.borrow_mut().push(req.clone());
            let start = req.offset.unwrap_or(0);
            let end = (start + req.limit).min(total);
            std::future::ready(Ok(Page::new((start..end).collect())))
        }
    }

    #[tokio::test]
    async fn test_offset_pagination_yields_everything_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, offset_source(120, log.clone()));

        let items = paginator.collect_all().await.unwrap();
        assert_eq!(items, (0..120).collect::<Vec<_>>());

        let offsets: Vec<_> = log.borrow().iter().map(|r| r.offset).collect();
        // Exhaustion is only seen on the empty page after the short one.
        assert_eq!(offsets, vec![Some(0), Some(50), Some(100), Some(120)]);
        assert_eq!(paginator.current_page(), 4);
    }

    #[tokio::test]
    async fn test_limit_caps_requests_and_items() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, offset_source(500, log.clone()))
            .with_limit(Some(70));

        let items = paginator.collect_all().await.unwrap();
        assert_eq!(items.len(), 70);

        let requests = log.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].limit, 50);
        assert_eq!(requests[1].limit, 20);
        assert_eq!(requests[1].offset, Some(50));
    }

    #[tokio::test]
    async fn test_zero_limit_never_fetches() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, offset_source(10, log.clone()))
            .with_limit(Some(0));

        assert_eq!(paginator.next().await.unwrap(), None);
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_iterator_stays_exhausted() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, offset_source(0, log.clone()));

        assert_eq!(paginator.next().await.unwrap(), None);
        assert_eq!(paginator.next().await.unwrap(), None);
        assert_eq!(log.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_pages_advance_by_server_count() {
        // Server listing of 6 items; odd values are dropped by the fetcher.
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let mut paginator = Paginator::new(CursorStrategy::Offset, 2, move |req: PageRequest| {
            log_clone.borrow_mut().push(req.offset);
            let start = req.offset.unwrap_or(0);
            let raw: Vec<u32> = (start..(start + req.limit).min(6)).collect();
            let kept = raw.iter().copied().filter(|n| n % 2 == 0).collect();
            std::future::ready(Ok(Page::filtered(raw.len(), kept)))
        });

        let items = paginator.collect_all().await.unwrap();
        assert_eq!(items, vec![0, 2, 4]);
        assert_eq!(*log.borrow(), vec![Some(0), Some(2), Some(4), Some(6)]);
    }

    #[tokio::test]
    async fn test_fully_filtered_page_does_not_end_walk() {
        let mut paginator = Paginator::new(CursorStrategy::Offset, 2, |req: PageRequest| {
            let page = match req.offset {
                Some(0) => Page::filtered(2, vec![]),
                Some(2) => Page::new(vec!["a"]),
                _ => Page::new(vec![]),
            };
            std::future::ready(Ok(page))
        });

        assert_eq!(paginator.collect_all().await.unwrap(), vec!["a"]);
        assert_eq!(paginator.current_page(), 3);
    }

    #[tokio::test]
    async fn test_after_cursor_threads_previous_token() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut paginator = Paginator::new(CursorStrategy::After, 2, move |req: PageRequest| {
            seen_clone.borrow_mut().push(req.after.clone());
            let page = match req.after.as_deref() {
                None => Page::new(vec!["a", "b"]).with_after(Some("b".to_string())),
                Some("b") => Page::new(vec!["c"]).with_after(None),
                Some(other) => panic!("unexpected cursor {other}"),
            };
            std::future::ready(Ok(page))
        });

        let items = paginator.collect_all().await.unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(*seen.borrow(), vec![None, Some("b".to_string())]);
    }

    #[tokio::test]
    async fn test_absent_list_terminates() {
        let mut calls = 0;
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, |_req: PageRequest| {
            calls += 1;
            std::future::ready(Ok(Page::<u32>::absent()))
        });

        assert_eq!(paginator.next().await.unwrap(), None);
        assert_eq!(paginator.next().await.unwrap(), None);
        drop(paginator);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_end_flag_yields_page_then_stops() {
        let mut calls = 0;
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, |_req: PageRequest| {
            calls += 1;
            std::future::ready(Ok(Page::new(vec![1, 2]).with_end(true)))
        });

        let items = paginator.collect_all().await.unwrap();
        drop(paginator);
        assert_eq!(items, vec![1, 2]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let mut paginator = Paginator::new(CursorStrategy::Offset, 50, |_req: PageRequest| {
            std::future::ready(Err::<Page<u32>, _>(crate::SyncError::Http(
                "connection reset".to_string(),
            )))
        });

        assert!(matches!(
            paginator.next().await,
            Err(crate::SyncError::Http(_))
        ));
    }

    #[test]
    fn test_page_request_query() {
        let request = PageRequest {
            limit: 20,
            offset: None,
            after: Some("0abc".to_string()),
        };
        assert_eq!(request.to_query(), "limit=20&after=0abc");
        assert_eq!(PageRequest::first(50).to_query(), "limit=50&offset=0");
    }
}

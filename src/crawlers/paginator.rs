use chrono::Utc;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::backoff::{BackoffPolicy, Sleeper};
use crate::config::{CategoryConfig, PaginationConfig, PaginationMode};
use crate::crawlers::fetcher::Fetcher;
use crate::dedup::filter_new;
use crate::parsers::{Extractor, PageContext};
use crate::state::ScrapeState;

/// Why a category stopped contributing records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The listing answered 404, i.e. pagination ran off the end
    NaturalEnd,
    /// Consecutive fetch failures exhausted the retry budget
    TooManyErrors,
    /// The page held no product records at all
    EmptyPage,
    /// Every record on the page had already been seen
    NoNewProducts,
    /// The category reached the total the payload reported
    QuotaReached,
    /// The payload signalled there are no further pages
    NoMorePages,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminalReason::NaturalEnd => "natural end of pagination",
            TerminalReason::TooManyErrors => "too many consecutive errors",
            TerminalReason::EmptyPage => "empty page",
            TerminalReason::NoNewProducts => "no new products",
            TerminalReason::QuotaReached => "reported total reached",
            TerminalReason::NoMorePages => "no more pages",
        };
        f.write_str(text)
    }
}

/// Position in a category's paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// 1-based page number
    Page(u32),
    /// Continuation token; `None` for the first request
    Token(Option<String>),
}

/// Driver state for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Running(PageCursor),
    Done(TerminalReason),
}

/// Passed to the progress hook after every page that added records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress<'a> {
    pub category: &'a str,
    pub page_index: u32,
    pub new_count: usize,
    pub total_so_far: usize,
}

/// How a category traversal ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOutcome {
    pub category: String,
    pub reason: TerminalReason,
    pub pages: u32,
    pub new_records: usize,
}

/// Counters carried across iterations of one traversal
#[derive(Debug, Default)]
struct Traversal {
    failures: u32,
    page_index: u32,
    pages_fetched: u32,
    scope_count: usize,
    new_records: usize,
}

/// Walks one category page by page: fetch, extract, dedupe, accumulate
pub struct Paginator<'a> {
    fetcher: &'a dyn Fetcher,
    sleeper: &'a dyn Sleeper,
    extractor: &'a Extractor,
    pagination: &'a PaginationConfig,
    backoff: &'a BackoffPolicy,
    base_url: &'a Url,
    capture_raw: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        sleeper: &'a dyn Sleeper,
        extractor: &'a Extractor,
        pagination: &'a PaginationConfig,
        backoff: &'a BackoffPolicy,
        base_url: &'a Url,
    ) -> Self {
        Self {
            fetcher,
            sleeper,
            extractor,
            pagination,
            backoff,
            base_url,
            capture_raw: false,
        }
    }

    /// Keep the untransformed payload fragments in `ScrapeState::raw`
    pub fn with_raw_capture(mut self, capture_raw: bool) -> Self {
        self.capture_raw = capture_raw;
        self
    }

    fn initial_cursor(&self) -> PageCursor {
        match self.pagination.mode {
            PaginationMode::Pages => PageCursor::Page(self.pagination.start_page),
            PaginationMode::Cursor => PageCursor::Token(None),
        }
    }

    /// Query parameters for the request at `cursor`
    pub fn query_for(&self, cursor: &PageCursor) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = self
            .pagination
            .query
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(param) = &self.pagination.cache_buster_param {
            query.push((param.clone(), Utc::now().timestamp_millis().to_string()));
        }

        match cursor {
            PageCursor::Page(page) => query.push((self.pagination.param.clone(), page.to_string())),
            PageCursor::Token(Some(token)) => {
                query.push((self.pagination.param.clone(), token.clone()))
            }
            PageCursor::Token(None) => {}
        }

        if let Some(limit) = self.pagination.limit {
            query.push((self.pagination.limit_param.clone(), limit.to_string()));
        }

        query
    }

    /// Traverse `category` until a terminal state, appending new records to `state`
    pub async fn run(
        &self,
        category: &CategoryConfig,
        state: &mut ScrapeState,
        on_page: &mut (dyn FnMut(&PageProgress) + Send),
    ) -> CategoryOutcome {
        ::log::info!("Scraping category {} from {}", category.name, category.url);

        let mut traversal = Traversal {
            page_index: 1,
            scope_count: state.category_count(&category.name),
            ..Traversal::default()
        };
        let mut crawl_state = CrawlState::Running(self.initial_cursor());

        let reason = loop {
            match crawl_state {
                CrawlState::Running(cursor) => {
                    crawl_state = self
                        .step(category, cursor, state, &mut traversal, on_page)
                        .await;
                }
                CrawlState::Done(reason) => break reason,
            }
        };

        log_terminal(&category.name, reason, traversal.page_index);

        CategoryOutcome {
            category: category.name.clone(),
            reason,
            pages: traversal.pages_fetched,
            new_records: traversal.new_records,
        }
    }

    /// One iteration of the state machine
    async fn step(
        &self,
        category: &CategoryConfig,
        cursor: PageCursor,
        state: &mut ScrapeState,
        traversal: &mut Traversal,
        on_page: &mut (dyn FnMut(&PageProgress) + Send),
    ) -> CrawlState {
        let query = self.query_for(&cursor);
        let payload = match self.fetcher.fetch(&category.url, &query).await {
            Ok(payload) => payload,
            Err(e) if e.is_natural_end() => return CrawlState::Done(TerminalReason::NaturalEnd),
            Err(e) => {
                traversal.failures += 1;
                ::log::warn!(
                    "Fetch failed for {} page {} (attempt {}/{}): {}",
                    category.name,
                    traversal.page_index,
                    traversal.failures,
                    self.backoff.max_attempts(),
                    e
                );
                if self.backoff.exhausted(traversal.failures) {
                    return CrawlState::Done(TerminalReason::TooManyErrors);
                }
                self.sleeper
                    .sleep(self.backoff.delay(traversal.failures - 1))
                    .await;
                return CrawlState::Running(cursor);
            }
        };
        traversal.failures = 0;
        traversal.pages_fetched += 1;

        let ctx = PageContext {
            category: &category.name,
            base_url: self.base_url,
            records_so_far: traversal.scope_count,
            scraped_at: Utc::now(),
        };
        let extraction = match self.extractor.extract(&payload, &ctx) {
            Ok(extraction) => extraction,
            Err(e) => {
                ::log::info!(
                    "No product data on {} page {}: {}",
                    category.name,
                    traversal.page_index,
                    e
                );
                return CrawlState::Done(TerminalReason::EmptyPage);
            }
        };
        if extraction.records.is_empty() {
            return CrawlState::Done(TerminalReason::EmptyPage);
        }

        let fresh = filter_new(extraction.records, &mut state.seen_ids);
        if fresh.is_empty() {
            return CrawlState::Done(TerminalReason::NoNewProducts);
        }

        let new_count = fresh.len();
        state.accumulated.extend(fresh);
        if self.capture_raw {
            state.raw.extend(extraction.raw);
        }
        traversal.scope_count += new_count;
        traversal.new_records += new_count;

        on_page(&PageProgress {
            category: &category.name,
            page_index: traversal.page_index,
            new_count,
            total_so_far: state.len(),
        });

        if let Some(total) = extraction.total_count {
            if traversal.scope_count as u64 >= total {
                return CrawlState::Done(TerminalReason::QuotaReached);
            }
        }
        if !extraction.signal_more {
            return CrawlState::Done(TerminalReason::NoMorePages);
        }

        let next = match cursor {
            PageCursor::Page(page) => PageCursor::Page(page + 1),
            PageCursor::Token(_) => match extraction.next_cursor {
                Some(token) => PageCursor::Token(Some(token)),
                None => return CrawlState::Done(TerminalReason::NoMorePages),
            },
        };

        traversal.page_index += 1;
        self.sleeper
            .sleep(Duration::from_millis(self.pagination.page_delay_ms))
            .await;
        CrawlState::Running(next)
    }
}

fn log_terminal(category: &str, reason: TerminalReason, page_index: u32) {
    match reason {
        TerminalReason::TooManyErrors => {
            ::log::warn!("Stopping {} at page {}: {}", category, page_index, reason)
        }
        TerminalReason::NoMorePages => {
            ::log::debug!("Finished {} at page {}: {}", category, page_index, reason)
        }
        _ => ::log::info!("Finished {} at page {}: {}", category, page_index, reason),
    }
}

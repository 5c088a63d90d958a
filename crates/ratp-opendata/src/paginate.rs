//! Offset pagination over the records endpoint.
//!
//! Pages are requested at offsets `0, p, 2p, ...` until one of:
//! - a page holds fewer than `p` records (natural end of data),
//! - the envelope's `total_count` has been reached,
//! - `max_pages` requests have been issued (safety bound),
//! - a request fails.
//!
//! A failure does not throw away earlier pages: the records gathered so far
//! come back together with the error, and [`FetchOutcome::is_complete`]
//! tells the two cases apart.

use std::future::Future;

use ratp_core::MAX_PAGE_SIZE;

use crate::error::OpenDataError;
use crate::types::{Page, Record};

/// Anything that can serve one page of records.
pub trait PageSource {
    fn fetch_page(
        &self,
        offset: u64,
        limit: u32,
    ) -> impl Future<Output = Result<Page, OpenDataError>> + Send;
}

/// Result of one full pagination cycle.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Records from every successful page, in API order.
    pub records: Vec<Record>,
    /// The failure that stopped the cycle early, if any.
    pub error: Option<OpenDataError>,
    /// Number of requests that returned a page.
    pub pages_fetched: usize,
    /// `true` when `max_pages` was hit while more data was expected.
    pub truncated: bool,
}

impl FetchOutcome {
    /// `true` when no request failed. A truncated cycle still counts as
    /// complete; the bound is a safeguard, not an error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Splits into the records or the error, discarding partial data.
    ///
    /// # Errors
    ///
    /// Returns the page error when the cycle did not complete.
    pub fn into_result(self) -> Result<Vec<Record>, OpenDataError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }
}

/// Fetches every page from `source`, `page_size` records at a time.
///
/// `page_size` must be within `1..=100`; anything else fails before any
/// request is made. A `max_pages` of zero is treated as one.
pub async fn fetch_all<S>(source: &S, page_size: u32, max_pages: usize) -> FetchOutcome
where
    S: PageSource + ?Sized,
{
    let mut outcome = FetchOutcome::default();

    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        outcome.error = Some(OpenDataError::InvalidPageSize {
            page_size,
            max: MAX_PAGE_SIZE,
        });
        return outcome;
    }

    let max_pages = max_pages.max(1);
    let page_len = page_size as usize;
    let mut offset: u64 = 0;

    loop {
        if outcome.pages_fetched >= max_pages {
            tracing::warn!(
                max_pages,
                records = outcome.records.len(),
                "pagination stopped at page limit; dataset may be incomplete"
            );
            outcome.truncated = true;
            break;
        }

        let page = match source.fetch_page(offset, page_size).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    offset,
                    records = outcome.records.len(),
                    "records page failed; returning partial results"
                );
                outcome.error = Some(e);
                break;
            }
        };

        outcome.pages_fetched += 1;
        let returned = page.records.len();
        outcome.records.extend(page.records);
        tracing::debug!(offset, returned, total = ?page.total_count, "records page received");

        if returned < page_len {
            break;
        }
        if page
            .total_count
            .is_some_and(|total| outcome.records.len() as u64 >= total)
        {
            break;
        }

        offset += u64::from(page_size);
    }

    outcome
}

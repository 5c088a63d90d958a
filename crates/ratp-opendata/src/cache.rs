//! Time-bounded cache holding the one dataset this service knows about.
//!
//! A snapshot is valid while `now - fetched_at < ttl`. The check is lazy:
//! nothing refreshes in the background, the next [`DatasetCache::get_dataset`]
//! after expiry runs a full pagination cycle. If that cycle fails and an
//! older snapshot exists, the old snapshot is served with a warning instead
//! of failing the request.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::OpenDataError;
use crate::paginate::{fetch_all, PageSource};
use crate::types::Record;

/// Source of the current time. Injected so TTL handling can be tested
/// without sleeping.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Paging and expiry settings for [`DatasetCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub page_size: u32,
    pub max_pages: usize,
}

impl CacheSettings {
    #[must_use]
    pub fn from_app_config(config: &ratp_core::AppConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.cache_ttl_secs),
            page_size: config.page_size,
            max_pages: config.max_pages,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            page_size: ratp_core::MAX_PAGE_SIZE,
            max_pages: 100,
        }
    }
}

/// All records retrieved by one successful fetch cycle.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub records: Vec<Record>,
    pub fetched_at: DateTime<Utc>,
    pub pages_fetched: usize,
    /// The cycle stopped at the page limit rather than at the end of data.
    pub truncated: bool,
}

/// How the snapshot in a [`CacheRead`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Served from cache without any request.
    Cached,
    /// Fetched during this call.
    Refreshed,
    /// A refresh was attempted and failed; this is the previous snapshot.
    Stale { warning: String },
}

#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Arc<DatasetSnapshot>,
    pub freshness: Freshness,
}

impl CacheRead {
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale { .. })
    }
}

/// Owns the current snapshot and the page source used to rebuild it.
///
/// Takes `&mut self` for every read, so callers sharing one cache must
/// serialize access (the server keeps it behind a mutex).
pub struct DatasetCache<S, C = SystemClock> {
    source: S,
    clock: C,
    settings: CacheSettings,
    snapshot: Option<Arc<DatasetSnapshot>>,
    force_refresh: bool,
}

impl<S: PageSource> DatasetCache<S, SystemClock> {
    pub fn new(source: S, settings: CacheSettings) -> Self {
        Self::with_clock(source, SystemClock, settings)
    }
}

impl<S: PageSource, C: Clock> DatasetCache<S, C> {
    pub fn with_clock(source: S, clock: C, settings: CacheSettings) -> Self {
        Self {
            source,
            clock,
            settings,
            snapshot: None,
            force_refresh: false,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The current snapshot, without checking expiry or fetching.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<DatasetSnapshot>> {
        self.snapshot.clone()
    }

    /// Whether the current snapshot exists and is inside the TTL window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.force_refresh
            && self
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| self.is_fresh(snapshot))
    }

    /// Makes the next read refetch even inside the TTL window.
    ///
    /// The current snapshot is kept untouched for stale fallback.
    pub fn invalidate(&mut self) {
        self.force_refresh = true;
    }

    /// Returns the dataset, refetching it when missing or expired.
    ///
    /// # Errors
    ///
    /// Returns the page error when a refresh fails and there is no earlier
    /// snapshot to fall back on. Partial records from the failed cycle are
    /// discarded.
    pub async fn get_dataset(&mut self) -> Result<CacheRead, OpenDataError> {
        if let Some(snapshot) = self.snapshot.as_ref() {
            if !self.force_refresh && self.is_fresh(snapshot) {
                return Ok(CacheRead {
                    snapshot: Arc::clone(snapshot),
                    freshness: Freshness::Cached,
                });
            }
        }

        let outcome = fetch_all(
            &self.source,
            self.settings.page_size,
            self.settings.max_pages,
        )
        .await;
        self.force_refresh = false;

        match outcome.error {
            None => {
                let snapshot = Arc::new(DatasetSnapshot {
                    records: outcome.records,
                    fetched_at: self.clock.now(),
                    pages_fetched: outcome.pages_fetched,
                    truncated: outcome.truncated,
                });
                tracing::info!(
                    records = snapshot.records.len(),
                    pages = snapshot.pages_fetched,
                    truncated = snapshot.truncated,
                    "dataset refreshed"
                );
                self.snapshot = Some(Arc::clone(&snapshot));
                Ok(CacheRead {
                    snapshot,
                    freshness: Freshness::Refreshed,
                })
            }
            Some(error) => match self.snapshot.as_ref() {
                Some(previous) => {
                    tracing::warn!(
                        error = %error,
                        fetched_at = %previous.fetched_at,
                        "dataset refresh failed; serving stale snapshot"
                    );
                    Ok(CacheRead {
                        snapshot: Arc::clone(previous),
                        freshness: Freshness::Stale {
                            warning: format!("refresh failed, showing earlier data: {error}"),
                        },
                    })
                }
                None => {
                    tracing::error!(
                        error = %error,
                        partial_records = outcome.records.len(),
                        "dataset fetch failed with no cached snapshot"
                    );
                    Err(error)
                }
            },
        }
    }

    fn is_fresh(&self, snapshot: &DatasetSnapshot) -> bool {
        let ttl = TimeDelta::from_std(self.settings.ttl).unwrap_or(TimeDelta::MAX);
        self.clock.now().signed_duration_since(snapshot.fetched_at) < ttl
    }
}

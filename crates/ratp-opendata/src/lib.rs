pub mod cache;
pub mod client;
pub mod error;
pub mod normalize;
pub mod paginate;
pub mod types;

pub use cache::{CacheRead, CacheSettings, Clock, DatasetCache, DatasetSnapshot, Freshness, SystemClock};
pub use client::OpenDataClient;
pub use error::OpenDataError;
pub use normalize::{normalize, CoordinateError, DroppedRow, NormalizedTable};
pub use paginate::{fetch_all, FetchOutcome, PageSource};
pub use types::{Page, Record};

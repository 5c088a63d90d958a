//! Response shapes of the Opendatasoft Explore v2.1 `records` endpoint.
//!
//! The endpoint wraps each page in an envelope:
//!
//! ```text
//! {"total_count": 1234, "results": [{"tco_libelle": "Presse", ...}, ...]}
//! ```
//!
//! Older exports and some mirrors return the bare array instead. Both are
//! accepted; only the envelope carries `total_count`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One shop object exactly as the API returned it.
pub type Record = Map<String, Value>;

/// A single page of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Total number of matching records, when the API reports it.
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PageBody {
    Envelope {
        #[serde(default)]
        total_count: Option<u64>,
        results: Vec<Record>,
    },
    Bare(Vec<Record>),
}

impl From<PageBody> for Page {
    fn from(body: PageBody) -> Self {
        match body {
            PageBody::Envelope {
                total_count,
                results,
            } => Page {
                records: results,
                total_count,
            },
            PageBody::Bare(records) => Page {
                records,
                total_count: None,
            },
        }
    }
}

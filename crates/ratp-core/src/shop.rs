//! The fixed-shape shop row produced by normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used when a non-geographic field is absent from a source record,
/// so grouping always has something to group by.
pub const UNKNOWN: &str = "unknown";

/// Column header used by the CSV export, in output order.
pub const CSV_COLUMNS: [&str; 8] = [
    "shop_type",
    "name",
    "closing_day",
    "street",
    "postal_code",
    "commune",
    "latitude",
    "longitude",
];

/// One approved shop with canonical column names.
///
/// Coordinates are always real values: rows whose location could not be
/// extracted never become a `ShopRow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRow {
    pub shop_type: String,
    pub name: String,
    pub closing_day: String,
    pub street: String,
    pub postal_code: String,
    pub commune: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Source fields that did not map onto a canonical column.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ShopRow {
    /// Values in [`CSV_COLUMNS`] order.
    #[must_use]
    pub fn csv_record(&self) -> [String; 8] {
        [
            self.shop_type.clone(),
            self.name.clone(),
            self.closing_day.clone(),
            self.street.clone(),
            self.postal_code.clone(),
            self.commune.clone(),
            self.latitude.to_string(),
            self.longitude.to_string(),
        ]
    }
}

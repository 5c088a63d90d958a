//! The per-request pipeline: snapshot + filter selection → view model.
//!
//! Nothing here keeps state between calls. Every call normalizes the
//! snapshot, applies the selection and recomputes every aggregate, so the
//! result depends only on its arguments.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ratp_core::{FilterSelection, ShopRow};
use ratp_opendata::{normalize, CacheRead, Freshness, NormalizedTable, Record};
use serde::Serialize;

use crate::aggregate::{
    count_by, cross_tab, histogram, monthly_counts, CrossTab, Distribution, GroupColumn,
    GroupCounts, GroupOrder, HistogramBin, MonthCount,
};
use crate::error::DashboardError;

const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Order of the `by_type` and `by_commune` groups.
    pub order: GroupOrder,
    /// Number of largest communes kept in the cross-tabulation.
    pub top_communes: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            order: GroupOrder::CountDesc,
            top_communes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total_shops: usize,
    pub shop_types: usize,
    pub communes: usize,
}

/// Shape of the raw records behind a listing, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawSummary {
    pub records: usize,
    /// Distinct source field names across all records.
    pub fields: usize,
    /// Record/field pairs that are absent or null.
    pub missing_values: usize,
}

/// Values offered by the filter controls, taken from the unfiltered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub shop_types: Vec<String>,
    pub communes: Vec<String>,
    pub selected: FilterSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub shop_type: String,
    pub commune: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub fetched_at: DateTime<Utc>,
    /// Non-blocking notice, set when older data is shown after a failed refresh.
    pub notice: Option<String>,
    pub truncated: bool,
    pub source_records: usize,
    /// Records excluded because their location was missing or malformed.
    pub dropped_rows: usize,
    pub overview: Overview,
    pub filters: FilterOptions,
    pub by_type: GroupCounts,
    pub by_commune: GroupCounts,
    pub cross_tab: CrossTab,
    pub type_distribution: Option<Distribution>,
    pub commune_distribution: Option<Distribution>,
    pub type_histogram: Vec<HistogramBin>,
    /// Shops per month, when the records carry a creation date.
    pub monthly_counts: Option<Vec<MonthCount>>,
    pub map_points: Vec<MapPoint>,
}

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewOutcome {
    Ready(Box<DashboardView>),
    /// The fetch worked but no record survived normalization.
    NoData {
        source_records: usize,
        dropped_rows: usize,
        notice: Option<String>,
    },
}

/// Filtered rows plus the bookkeeping the raw-data listing shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredShops {
    pub rows: Vec<ShopRow>,
    pub source_records: usize,
    pub dropped_rows: usize,
    pub raw: RawSummary,
}

/// Builds the dashboard view for `selection` over the snapshot in `read`.
#[must_use]
pub fn build_view(
    selection: &FilterSelection,
    read: &CacheRead,
    options: &ViewOptions,
) -> ViewOutcome {
    let table = normalize(&read.snapshot.records);
    let notice = notice_of(&read.freshness);

    if table.is_empty() {
        tracing::warn!(
            records = read.snapshot.records.len(),
            dropped = table.dropped_count(),
            "no usable rows after normalization"
        );
        return ViewOutcome::NoData {
            source_records: read.snapshot.records.len(),
            dropped_rows: table.dropped_count(),
            notice,
        };
    }

    let filters = filter_options(&table, selection);
    let rows: Vec<&ShopRow> = selection.apply(&table.rows).collect();

    let by_type = count_by(rows.iter().copied(), &[GroupColumn::ShopType]).sorted(options.order);
    let by_commune = count_by(rows.iter().copied(), &[GroupColumn::Commune]).sorted(options.order);

    let top_communes: Vec<String> = count_by(rows.iter().copied(), &[GroupColumn::Commune])
        .sorted(GroupOrder::CountDesc)
        .top(options.top_communes)
        .groups()
        .iter()
        .map(|g| g.key[0].clone())
        .collect();
    let cross_tab = cross_tab(rows.iter().copied(), Some(top_communes.as_slice()));

    let type_counts = by_type.counts();
    let overview = Overview {
        total_shops: rows.len(),
        shop_types: by_type.len(),
        communes: by_commune.len(),
    };

    let map_points = rows
        .iter()
        .map(|row| MapPoint {
            latitude: row.latitude,
            longitude: row.longitude,
            name: row.name.clone(),
            shop_type: row.shop_type.clone(),
            commune: row.commune.clone(),
        })
        .collect();

    ViewOutcome::Ready(Box::new(DashboardView {
        fetched_at: read.snapshot.fetched_at,
        notice,
        truncated: read.snapshot.truncated,
        source_records: read.snapshot.records.len(),
        dropped_rows: table.dropped_count(),
        overview,
        filters,
        type_distribution: Distribution::of(&type_counts),
        commune_distribution: Distribution::of(&by_commune.counts()),
        type_histogram: histogram(&type_counts, HISTOGRAM_BINS),
        monthly_counts: monthly_counts(rows.iter().copied()),
        by_type,
        by_commune,
        cross_tab,
        map_points,
    }))
}

/// Normalized rows accepted by `selection`, for listings and export.
///
/// # Errors
///
/// Returns [`DashboardError::EmptyDataset`] when the snapshot has no usable
/// rows at all. A selection that matches nothing is not an error.
pub fn filtered_shops(
    selection: &FilterSelection,
    read: &CacheRead,
) -> Result<FilteredShops, DashboardError> {
    let table = normalize(&read.snapshot.records);
    if table.is_empty() {
        return Err(DashboardError::EmptyDataset {
            fetched_records: read.snapshot.records.len(),
            dropped_rows: table.dropped_count(),
        });
    }

    let dropped_rows = table.dropped_count();
    let raw = raw_summary(&read.snapshot.records);
    let rows = table
        .rows
        .into_iter()
        .filter(|row| selection.matches(row))
        .collect();

    Ok(FilteredShops {
        rows,
        source_records: read.snapshot.records.len(),
        dropped_rows,
        raw,
    })
}

/// Counts records, distinct field names and absent-or-null values.
#[must_use]
pub fn raw_summary(records: &[Record]) -> RawSummary {
    let fields: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();
    let missing_values = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .filter(|field| record.get(**field).is_none_or(|value| value.is_null()))
                .count()
        })
        .sum();

    RawSummary {
        records: records.len(),
        fields: fields.len(),
        missing_values,
    }
}

fn notice_of(freshness: &Freshness) -> Option<String> {
    match freshness {
        Freshness::Stale { warning } => Some(warning.clone()),
        Freshness::Cached | Freshness::Refreshed => None,
    }
}

fn filter_options(table: &NormalizedTable, selection: &FilterSelection) -> FilterOptions {
    let labels = |column: GroupColumn| -> Vec<String> {
        count_by(&table.rows, &[column])
            .sorted(GroupOrder::LabelAsc)
            .groups()
            .iter()
            .map(|g| g.key[0].clone())
            .collect()
    };

    FilterOptions {
        shop_types: labels(GroupColumn::ShopType),
        communes: labels(GroupColumn::Commune),
        selected: selection.clone(),
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;

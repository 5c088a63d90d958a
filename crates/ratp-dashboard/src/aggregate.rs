//! Grouped counts over shop rows.
//!
//! ## Ordering
//!
//! [`count_by`] returns groups in order of first appearance in the input.
//! Callers that want another order ask for it with [`GroupCounts::sorted`]:
//! - [`GroupOrder::FirstSeen`] keeps first-appearance order,
//! - [`GroupOrder::CountDesc`] puts the largest groups first,
//! - [`GroupOrder::LabelAsc`] orders by key, comparing columns left to right.
//!
//! Sorting is stable, so groups that tie keep their first-appearance order.
//!
//! [`cross_tab`] always orders both axes by label.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ratp_core::ShopRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupColumn {
    ShopType,
    Commune,
}

impl GroupColumn {
    #[must_use]
    pub fn value(self, row: &ShopRow) -> &str {
        match self {
            Self::ShopType => &row.shop_type,
            Self::Commune => &row.commune,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    #[default]
    FirstSeen,
    CountDesc,
    LabelAsc,
}

impl FromStr for GroupOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_seen" => Ok(Self::FirstSeen),
            "count" | "count_desc" => Ok(Self::CountDesc),
            "label" | "label_asc" => Ok(Self::LabelAsc),
            other => Err(format!(
                "unknown order \"{other}\" (expected first, count or label)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    /// One label per grouping column, in column order.
    pub key: Vec<String>,
    pub count: usize,
}

/// Result of [`count_by`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    columns: Vec<GroupColumn>,
    groups: Vec<GroupCount>,
}

impl GroupCounts {
    #[must_use]
    pub fn columns(&self) -> &[GroupColumn] {
        &self.columns
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupCount] {
        &self.groups
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of all group counts; equals the number of rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Count for an exact key, if that group exists.
    #[must_use]
    pub fn get(&self, key: &[&str]) -> Option<usize> {
        self.groups
            .iter()
            .find(|g| g.key.iter().map(String::as_str).eq(key.iter().copied()))
            .map(|g| g.count)
    }

    /// Group sizes in current order.
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.count).collect()
    }

    #[must_use]
    pub fn sorted(mut self, order: GroupOrder) -> Self {
        match order {
            GroupOrder::FirstSeen => {}
            GroupOrder::CountDesc => self.groups.sort_by(|a, b| b.count.cmp(&a.count)),
            GroupOrder::LabelAsc => self.groups.sort_by(|a, b| a.key.cmp(&b.key)),
        }
        self
    }

    /// Keeps the first `n` groups in current order.
    #[must_use]
    pub fn top(mut self, n: usize) -> Self {
        self.groups.truncate(n);
        self
    }
}

/// Counts rows per distinct combination of `columns`.
///
/// Pure function of its input. With no columns every row falls in a single
/// group with an empty key.
pub fn count_by<'a, I>(rows: I, columns: &[GroupColumn]) -> GroupCounts
where
    I: IntoIterator<Item = &'a ShopRow>,
{
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<GroupCount> = Vec::new();

    for row in rows {
        let key: Vec<String> = columns
            .iter()
            .map(|column| column.value(row).to_owned())
            .collect();
        match index.get(&key) {
            Some(&position) => groups[position].count += 1,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(GroupCount { key, count: 1 });
            }
        }
    }

    GroupCounts {
        columns: columns.to_vec(),
        groups,
    }
}

/// Shop type × commune contingency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub shop_types: Vec<String>,
    pub communes: Vec<String>,
    /// `cells[i][j]` counts rows with `shop_types[i]` in `communes[j]`.
    pub cells: Vec<Vec<usize>>,
    pub row_totals: Vec<usize>,
    pub column_totals: Vec<usize>,
    pub total: usize,
}

/// Builds the type × commune table, optionally limited to some communes.
///
/// With `communes = Some(list)`, only rows in those communes are counted;
/// communes in the list with no rows do not get a column.
pub fn cross_tab<'a, I>(rows: I, communes: Option<&[String]>) -> CrossTab
where
    I: IntoIterator<Item = &'a ShopRow>,
{
    let counts = count_by(
        rows.into_iter()
            .filter(|row| communes.is_none_or(|keep| keep.contains(&row.commune))),
        &[GroupColumn::ShopType, GroupColumn::Commune],
    );

    let mut shop_types: Vec<String> = counts.groups.iter().map(|g| g.key[0].clone()).collect();
    shop_types.sort();
    shop_types.dedup();
    let mut commune_labels: Vec<String> = counts.groups.iter().map(|g| g.key[1].clone()).collect();
    commune_labels.sort();
    commune_labels.dedup();

    let row_of: HashMap<&str, usize> = shop_types
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let column_of: HashMap<&str, usize> = commune_labels
        .iter()
        .enumerate()
        .map(|(j, label)| (label.as_str(), j))
        .collect();

    let mut cells = vec![vec![0usize; commune_labels.len()]; shop_types.len()];
    for group in counts.groups() {
        let i = row_of[group.key[0].as_str()];
        let j = column_of[group.key[1].as_str()];
        cells[i][j] = group.count;
    }

    let row_totals: Vec<usize> = cells.iter().map(|row| row.iter().sum()).collect();
    let column_totals: Vec<usize> = (0..commune_labels.len())
        .map(|j| cells.iter().map(|row| row[j]).sum())
        .collect();
    let total = row_totals.iter().sum();

    CrossTab {
        shop_types,
        communes: commune_labels,
        cells,
        row_totals,
        column_totals,
        total,
    }
}

/// Five-number summary plus mean of a set of group sizes, as drawn by a
/// box plot. Quartiles use linear interpolation between closest ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub groups: usize,
    pub min: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: usize,
    pub mean: f64,
}

impl Distribution {
    /// `None` for an empty slice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(counts: &[usize]) -> Option<Self> {
        let mut sorted = counts.to_vec();
        sorted.sort_unstable();
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let mean = sorted.iter().sum::<usize>() as f64 / sorted.len() as f64;

        Some(Self {
            groups: sorted.len(),
            min,
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max,
            mean,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn quantile(sorted: &[usize], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - position.floor();
    sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * fraction
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower bound.
    pub lower: usize,
    /// Exclusive upper bound.
    pub upper: usize,
    pub count: usize,
}

/// Frequency histogram of group sizes over at most `bins` equal-width bins.
#[must_use]
pub fn histogram(values: &[usize], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let span = max - min + 1;
    let bins = bins.clamp(1, span);
    let width = span.div_ceil(bins);

    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|b| HistogramBin {
            lower: min + b * width,
            upper: (min + (b + 1) * width).min(max + 1),
            count: 0,
        })
        .filter(|bin| bin.lower <= max)
        .collect();

    for &value in values {
        let slot = ((value - min) / width).min(result.len() - 1);
        result[slot].count += 1;
    }
    result
}

/// Passthrough fields searched for a date, in order of preference.
pub const DATE_FIELDS: [&str; 2] = ["date_creation", "date"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`.
    pub month: String,
    pub count: usize,
}

/// Rows per calendar month of the first [`DATE_FIELDS`] entry that any row
/// carries, oldest month first.
///
/// `None` when no row has a date field or no value parses as a date. Rows
/// with an unreadable date are left out of the counts.
pub fn monthly_counts<'a, I>(rows: I) -> Option<Vec<MonthCount>>
where
    I: IntoIterator<Item = &'a ShopRow>,
    I::IntoIter: Clone,
{
    let rows = rows.into_iter();
    let field = DATE_FIELDS
        .iter()
        .find(|field| rows.clone().any(|row| row.extra.contains_key(**field)))?;

    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        if let Some(month) = row
            .extra
            .get(*field)
            .and_then(|value| value.as_str())
            .and_then(month_of)
        {
            *months.entry(month).or_default() += 1;
        }
    }

    if months.is_empty() {
        return None;
    }
    Some(
        months
            .into_iter()
            .map(|(month, count)| MonthCount { month, count })
            .collect(),
    )
}

fn month_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            ["%Y-%m-%d", "%d/%m/%Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok())?;
    Some(date.format("%Y-%m").to_string())
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;

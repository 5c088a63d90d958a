//! User filter selection over shop types and communes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::shop::ShopRow;

/// Selected shop types and communes.
///
/// An empty set places no restriction on that axis, matching a multiselect
/// where nothing has been picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub shop_types: BTreeSet<String>,
    pub communes: BTreeSet<String>,
}

impl FilterSelection {
    #[must_use]
    pub fn new<T, C>(shop_types: T, communes: C) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            shop_types: shop_types.into_iter().map(Into::into).collect(),
            communes: communes.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a selection from comma-separated query values such as
    /// `types=Boulangerie,Presse`. Blank entries are ignored.
    #[must_use]
    pub fn from_comma_lists(shop_types: Option<&str>, communes: Option<&str>) -> Self {
        Self {
            shop_types: split_list(shop_types),
            communes: split_list(communes),
        }
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.shop_types.is_empty() && self.communes.is_empty()
    }

    #[must_use]
    pub fn matches(&self, row: &ShopRow) -> bool {
        (self.shop_types.is_empty() || self.shop_types.contains(&row.shop_type))
            && (self.communes.is_empty() || self.communes.contains(&row.commune))
    }

    /// Rows of `rows` accepted by this selection, in input order.
    pub fn apply<'a>(&'a self, rows: &'a [ShopRow]) -> impl Iterator<Item = &'a ShopRow> + 'a {
        rows.iter().filter(move |row| self.matches(row))
    }
}

fn split_list(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn row(shop_type: &str, commune: &str) -> ShopRow {
        ShopRow {
            shop_type: shop_type.into(),
            name: "shop".into(),
            closing_day: "unknown".into(),
            street: "unknown".into(),
            postal_code: "unknown".into(),
            commune: commune.into(),
            latitude: 48.8,
            longitude: 2.3,
            extra: Map::new(),
        }
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let rows = vec![row("Presse", "Paris"), row("Tabac", "Vincennes")];
        let selection = FilterSelection::default();
        assert!(selection.is_unrestricted());
        assert_eq!(selection.apply(&rows).count(), 2);
    }

    #[test]
    fn both_axes_must_match() {
        let rows = vec![
            row("Presse", "Paris"),
            row("Presse", "Vincennes"),
            row("Tabac", "Paris"),
        ];
        let selection = FilterSelection::new(["Presse"], ["Paris"]);
        let kept: Vec<_> = selection.apply(&rows).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].commune, "Paris");
        assert_eq!(kept[0].shop_type, "Presse");
    }

    #[test]
    fn comma_lists_trim_and_skip_blanks() {
        let selection = FilterSelection::from_comma_lists(Some(" Presse , ,Tabac"), None);
        assert_eq!(selection.shop_types.len(), 2);
        assert!(selection.shop_types.contains("Tabac"));
        assert!(selection.communes.is_empty());
    }
}

use ratp_core::ShopRow;
use serde_json::Map;

use super::*;

fn row(shop_type: &str, commune: &str) -> ShopRow {
    ShopRow {
        shop_type: shop_type.into(),
        name: format!("{shop_type} {commune}"),
        closing_day: "unknown".into(),
        street: "unknown".into(),
        postal_code: "unknown".into(),
        commune: commune.into(),
        latitude: 48.85,
        longitude: 2.35,
        extra: Map::new(),
    }
}

fn sample() -> Vec<ShopRow> {
    vec![
        row("Presse", "Paris"),
        row("Boulangerie", "Vincennes"),
        row("Presse", "Vincennes"),
        row("Fleuriste", "Paris"),
        row("Boulangerie", "Paris"),
        row("Presse", "Paris"),
    ]
}

// -----------------------------------------------------------------------
// count_by
// -----------------------------------------------------------------------

#[test]
fn single_column_counts_sum_to_row_count() {
    let rows = sample();
    let by_type = count_by(&rows, &[GroupColumn::ShopType]);
    assert_eq!(by_type.total(), rows.len());
    assert_eq!(by_type.get(&["Presse"]), Some(3));
    assert_eq!(by_type.get(&["Boulangerie"]), Some(2));
    assert_eq!(by_type.get(&["Fleuriste"]), Some(1));
    assert_eq!(by_type.get(&["Tabac"]), None);
}

#[test]
fn default_order_is_first_appearance() {
    let rows = sample();
    let by_type = count_by(&rows, &[GroupColumn::ShopType]);
    let labels: Vec<_> = by_type.groups().iter().map(|g| g.key[0].as_str()).collect();
    assert_eq!(labels, ["Presse", "Boulangerie", "Fleuriste"]);
}

#[test]
fn pair_counts_marginals_match_single_column_counts() {
    let rows = sample();
    let by_type = count_by(&rows, &[GroupColumn::ShopType]);
    let by_pair = count_by(&rows, &[GroupColumn::ShopType, GroupColumn::Commune]);

    assert_eq!(by_pair.total(), rows.len());
    for group in by_type.groups() {
        let marginal: usize = by_pair
            .groups()
            .iter()
            .filter(|g| g.key[0] == group.key[0])
            .map(|g| g.count)
            .sum();
        assert_eq!(marginal, group.count, "marginal for {:?}", group.key);
    }
}

#[test]
fn count_desc_breaks_ties_by_first_appearance() {
    let rows = vec![
        row("Tabac", "Paris"),
        row("Presse", "Paris"),
        row("Presse", "Paris"),
        row("Tabac", "Paris"),
        row("Fleuriste", "Paris"),
    ];
    let sorted = count_by(&rows, &[GroupColumn::ShopType]).sorted(GroupOrder::CountDesc);
    let labels: Vec<_> = sorted.groups().iter().map(|g| g.key[0].as_str()).collect();
    assert_eq!(labels, ["Tabac", "Presse", "Fleuriste"]);
}

#[test]
fn label_order_sorts_keys() {
    let rows = sample();
    let sorted = count_by(&rows, &[GroupColumn::Commune]).sorted(GroupOrder::LabelAsc);
    let labels: Vec<_> = sorted.groups().iter().map(|g| g.key[0].as_str()).collect();
    assert_eq!(labels, ["Paris", "Vincennes"]);
}

#[test]
fn top_truncates_after_sorting() {
    let rows = sample();
    let top = count_by(&rows, &[GroupColumn::ShopType])
        .sorted(GroupOrder::CountDesc)
        .top(1);
    assert_eq!(top.len(), 1);
    assert_eq!(top.groups()[0].key, vec!["Presse".to_string()]);
}

#[test]
fn no_columns_gives_one_group() {
    let rows = sample();
    let all = count_by(&rows, &[]);
    assert_eq!(all.len(), 1);
    assert_eq!(all.get(&[]), Some(rows.len()));
}

#[test]
fn empty_input_gives_no_groups() {
    let rows: Vec<ShopRow> = Vec::new();
    let counts = count_by(&rows, &[GroupColumn::Commune]);
    assert!(counts.is_empty());
    assert_eq!(counts.total(), 0);
}

#[test]
fn group_order_parses_short_and_long_names() {
    assert_eq!("count".parse::<GroupOrder>(), Ok(GroupOrder::CountDesc));
    assert_eq!("label_asc".parse::<GroupOrder>(), Ok(GroupOrder::LabelAsc));
    assert_eq!("First".parse::<GroupOrder>(), Ok(GroupOrder::FirstSeen));
    assert!("random".parse::<GroupOrder>().is_err());
}

// -----------------------------------------------------------------------
// cross_tab
// -----------------------------------------------------------------------

#[test]
fn cross_tab_row_totals_equal_type_counts() {
    let rows = sample();
    let table = cross_tab(&rows, None);
    let by_type = count_by(&rows, &[GroupColumn::ShopType]);

    assert_eq!(table.shop_types, ["Boulangerie", "Fleuriste", "Presse"]);
    assert_eq!(table.communes, ["Paris", "Vincennes"]);
    for (label, total) in table.shop_types.iter().zip(&table.row_totals) {
        assert_eq!(by_type.get(&[label.as_str()]), Some(*total));
    }
    assert_eq!(table.total, rows.len());
    assert_eq!(table.column_totals, vec![4, 2]);
    assert_eq!(table.cells[2], vec![2, 1]);
}

#[test]
fn cross_tab_limited_to_selected_communes() {
    let rows = sample();
    let keep = vec!["Vincennes".to_string(), "Montreuil".to_string()];
    let table = cross_tab(&rows, Some(keep.as_slice()));
    assert_eq!(table.communes, ["Vincennes"]);
    assert_eq!(table.shop_types, ["Boulangerie", "Presse"]);
    assert_eq!(table.total, 2);
}

// -----------------------------------------------------------------------
// distribution / histogram
// -----------------------------------------------------------------------

#[test]
fn distribution_of_group_sizes() {
    let dist = Distribution::of(&[1, 3, 2, 4]).unwrap();
    assert_eq!(dist.groups, 4);
    assert_eq!(dist.min, 1);
    assert_eq!(dist.max, 4);
    assert!((dist.median - 2.5).abs() < 1e-9);
    assert!((dist.q1 - 1.75).abs() < 1e-9);
    assert!((dist.q3 - 3.25).abs() < 1e-9);
    assert!((dist.mean - 2.5).abs() < 1e-9);
}

#[test]
fn distribution_of_single_value() {
    let dist = Distribution::of(&[7]).unwrap();
    assert!((dist.q1 - 7.0).abs() < 1e-9);
    assert!((dist.q3 - 7.0).abs() < 1e-9);
}

#[test]
fn distribution_of_nothing_is_none() {
    assert!(Distribution::of(&[]).is_none());
}

#[test]
fn histogram_counts_every_value_once() {
    let values = [1, 1, 2, 5, 9, 10];
    let bins = histogram(&values, 3);
    assert_eq!(bins.len(), 3);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
    assert_eq!(bins[0].lower, 1);
    assert_eq!(bins[0].count, 3);
    assert_eq!(bins.last().unwrap().upper, 11);
}

#[test]
fn histogram_never_uses_more_bins_than_distinct_width() {
    let bins = histogram(&[4, 4, 5], 20);
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[0].count, 2);
    assert_eq!(bins[1].count, 1);
}

#[test]
fn histogram_of_nothing_is_empty() {
    assert!(histogram(&[], 10).is_empty());
}

// -----------------------------------------------------------------------
// monthly counts
// -----------------------------------------------------------------------

fn dated(field: &str, value: &str) -> ShopRow {
    let mut shop = row("Presse", "Paris");
    shop.extra
        .insert(field.to_owned(), serde_json::Value::String(value.to_owned()));
    shop
}

#[test]
fn monthly_counts_groups_by_month_in_order() {
    let rows = vec![
        dated("date_creation", "2023-05-14"),
        dated("date_creation", "2023-02-01T09:30:00+01:00"),
        dated("date_creation", "2023-05-02 10:00:00"),
        dated("date_creation", "17/02/2023"),
        dated("date_creation", "n/a"),
        row("Tabac", "Paris"),
    ];
    let months = monthly_counts(&rows).unwrap();
    assert_eq!(
        months,
        vec![
            MonthCount {
                month: "2023-02".into(),
                count: 2
            },
            MonthCount {
                month: "2023-05".into(),
                count: 2
            },
        ]
    );
}

#[test]
fn monthly_counts_prefers_date_creation_over_date() {
    let rows = vec![
        dated("date", "2021-01-01"),
        dated("date_creation", "2022-03-01"),
    ];
    let months = monthly_counts(&rows).unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].month, "2022-03");
}

#[test]
fn monthly_counts_without_date_field_is_none() {
    assert!(monthly_counts(&sample()).is_none());
}

#[test]
fn monthly_counts_with_only_unreadable_dates_is_none() {
    let rows = vec![dated("date", "bientôt")];
    assert!(monthly_counts(&rows).is_none());
}

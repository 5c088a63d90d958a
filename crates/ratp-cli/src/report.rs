//! Command handlers. Each one runs a single fetch cycle through the cache.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ratp_core::{AppConfig, FilterSelection};
use ratp_dashboard::{
    build_view, filtered_shops, raw_summary, write_csv, DashboardView, GroupCounts, GroupOrder,
    ViewOptions, ViewOutcome,
};
use ratp_opendata::{normalize, CacheRead, CacheSettings, DatasetCache, OpenDataClient};

async fn load_dataset(config: &AppConfig) -> anyhow::Result<CacheRead> {
    let client = OpenDataClient::from_app_config(config)?;
    let mut cache = DatasetCache::new(client, CacheSettings::from_app_config(config));
    let read = cache.get_dataset().await?;
    Ok(read)
}

/// Print overview metrics plus counts by type and by commune.
///
/// # Errors
///
/// Returns an error if the dataset cannot be fetched.
pub(crate) async fn run_summary(
    config: &AppConfig,
    selection: &FilterSelection,
    order: GroupOrder,
    top: usize,
) -> anyhow::Result<()> {
    let read = load_dataset(config).await?;
    let options = ViewOptions {
        order,
        top_communes: top,
    };

    match build_view(selection, &read, &options) {
        ViewOutcome::Ready(view) => print_summary(&view, top),
        ViewOutcome::NoData {
            source_records,
            dropped_rows,
            ..
        } => println!(
            "no usable shops: {source_records} records fetched, {dropped_rows} without a location"
        ),
    }
    Ok(())
}

fn print_summary(view: &DashboardView, top: usize) {
    println!(
        "fetched {} | {} shops | {} types | {} communes | {} dropped",
        view.fetched_at.format("%Y-%m-%d %H:%M"),
        view.overview.total_shops,
        view.overview.shop_types,
        view.overview.communes,
        view.dropped_rows,
    );
    if view.truncated {
        println!("warning: page limit reached, dataset is incomplete");
    }

    println!();
    print_counts("TYPE", &view.by_type, usize::MAX);
    println!();
    print_counts("COMMUNE", &view.by_commune, top);
}

fn print_counts(label: &str, counts: &GroupCounts, limit: usize) {
    println!("{label:<40}SHOPS");
    for group in counts.groups().iter().take(limit) {
        println!("{:<40}{}", group.key.join(" / "), group.count);
    }
}

/// Write the filtered shop table to `output` as CSV.
///
/// # Errors
///
/// Returns an error if the dataset cannot be fetched, has no usable rows, or
/// the file cannot be written.
pub(crate) async fn run_export(
    config: &AppConfig,
    selection: &FilterSelection,
    output: &Path,
) -> anyhow::Result<()> {
    let read = load_dataset(config).await?;
    let shops = filtered_shops(selection, &read)?;

    let file = File::create(output)?;
    let written = write_csv(&shops.rows, BufWriter::new(file))?;
    println!("wrote {written} shops to {}", output.display());
    Ok(())
}

/// Fetch every page once and report counts, without aggregating.
///
/// # Errors
///
/// Returns an error if the fetch fails.
pub(crate) async fn run_fetch(config: &AppConfig) -> anyhow::Result<()> {
    let read = load_dataset(config).await?;
    let table = normalize(&read.snapshot.records);

    println!(
        "{} records in {} pages, {} usable, {} dropped{}",
        read.snapshot.records.len(),
        read.snapshot.pages_fetched,
        table.rows.len(),
        table.dropped_count(),
        if read.snapshot.truncated {
            " (truncated at page limit)"
        } else {
            ""
        },
    );
    let raw = raw_summary(&read.snapshot.records);
    println!(
        "{} distinct fields, {} missing values",
        raw.fields, raw.missing_values
    );
    for dropped in table.dropped.iter().take(5) {
        println!("  record {}: {}", dropped.index, dropped.reason);
    }
    Ok(())
}

pub mod aggregate;
pub mod error;
pub mod export;
pub mod view;

pub use aggregate::{
    count_by, cross_tab, histogram, monthly_counts, CrossTab, Distribution, GroupColumn, GroupCount,
    GroupCounts, GroupOrder, HistogramBin, MonthCount, DATE_FIELDS,
};
pub use error::DashboardError;
pub use export::{to_csv_string, write_csv};
pub use view::{
    build_view, filtered_shops, raw_summary, DashboardView, FilteredShops, RawSummary, ViewOptions,
    ViewOutcome,
};

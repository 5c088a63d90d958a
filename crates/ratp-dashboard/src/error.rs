use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Every page was fetched but normalization left nothing usable.
    #[error("dataset has no usable rows ({fetched_records} fetched, {dropped_rows} dropped)")]
    EmptyDataset {
        fetched_records: usize,
        dropped_rows: usize,
    },

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

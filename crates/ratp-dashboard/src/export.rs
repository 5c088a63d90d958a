//! CSV export of the filtered shop table.

use std::io::Write;

use ratp_core::{ShopRow, CSV_COLUMNS};

use crate::error::DashboardError;

/// Writes a header row then one record per shop, returning the number of
/// shops written. Passthrough fields are not exported.
///
/// # Errors
///
/// Returns [`DashboardError::Csv`] or [`DashboardError::Io`] when the writer
/// fails.
pub fn write_csv<'a, I, W>(rows: I, writer: W) -> Result<usize, DashboardError>
where
    I: IntoIterator<Item = &'a ShopRow>,
    W: Write,
{
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_COLUMNS)?;

    let mut written = 0usize;
    for row in rows {
        out.write_record(row.csv_record())?;
        written += 1;
    }
    out.flush()?;

    tracing::debug!(rows = written, "wrote csv export");
    Ok(written)
}

/// In-memory variant of [`write_csv`].
///
/// # Errors
///
/// Returns [`DashboardError::Csv`] when serialization fails.
pub fn to_csv_string<'a, I>(rows: I) -> Result<String, DashboardError>
where
    I: IntoIterator<Item = &'a ShopRow>,
{
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn row(name: &str, street: &str) -> ShopRow {
        ShopRow {
            shop_type: "Presse".into(),
            name: name.into(),
            closing_day: "Dimanche".into(),
            street: street.into(),
            postal_code: "75012".into(),
            commune: "Paris".into(),
            latitude: 48.8443,
            longitude: 2.3744,
            extra: Map::new(),
        }
    }

    #[test]
    fn header_comes_first() {
        let csv = to_csv_string(&[row("Relay", "Gare de Lyon")]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("shop_type,name,closing_day,street,postal_code,commune,latitude,longitude")
        );
        assert_eq!(
            lines.next(),
            Some("Presse,Relay,Dimanche,Gare de Lyon,75012,Paris,48.8443,2.3744")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let csv = to_csv_string(&[row("Relay", "place Louis-Armand, hall 1")]).unwrap();
        assert!(csv.contains("\"place Louis-Armand, hall 1\""));
    }

    #[test]
    fn empty_selection_still_writes_header() {
        let rows: Vec<ShopRow> = Vec::new();
        let csv = to_csv_string(&rows).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn write_csv_reports_row_count() {
        let rows = vec![row("A", "x"), row("B", "y"), row("C", "z")];
        let mut buffer = Vec::new();
        assert_eq!(write_csv(&rows, &mut buffer).unwrap(), 3);
    }

    #[test]
    fn export_reads_back_with_same_columns() {
        let rows = vec![row("Relay", "Gare de Lyon")];
        let csv = to_csv_string(&rows).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_COLUMNS);
        assert_eq!(reader.records().count(), 1);
    }
}

//! Event source backed by the published Google Sheets CSV feed.
//!
//! The sheet is maintained by hand, so the parser tolerates header
//! variants ("Data inizio" / "Data Inizio" / "data inizio") and missing
//! columns; every absent field becomes an empty string. Any fetch or
//! parse failure is a hard error: the catalog build aborts rather than
//! showing a partial calendar.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use bancarella_core::{
    model::RawEventRecord,
    ports::{EventSourcePort, PortError},
};

/// Published CSV export of the municipal events sheet.
const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1BCCgGLKYZOz3SdWZx199kbp1PV387N_qzM3oTuRVESU/gviz/tq?tqx=out:csv&sheet=Foglio1";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Event source reading the published sheet.
pub struct SheetsEventSource {
    client: Client,
    url: String,
}

impl SheetsEventSource {
    /// Create a source bound to the given HTTP client and the default
    /// published sheet.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            url: String::from(SHEET_URL),
        }
    }

    /// Create a source reading from a custom URL (tests, staging sheet).
    #[must_use]
    pub fn with_url(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl EventSourcePort for SheetsEventSource {
    async fn records(&self) -> Result<Vec<RawEventRecord>, PortError> {
        let body = self
            .client
            .get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let records = parse_rows(&body)?;
        info!(count = records.len(), "sheet feed parsed");
        Ok(records)
    }
}

/// Case- and spacing-insensitive header key.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the CSV body into raw records. Public so tests and offline
/// tooling can run the parser without a network fetch.
///
/// # Errors
///
/// Returns [`PortError::InvalidResponse`] when the body is not valid
/// CSV with a header row.
pub fn parse_rows(body: &str) -> Result<Vec<RawEventRecord>, PortError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| PortError::InvalidResponse(error.to_string()))?
        .clone();

    let mut positions: HashMap<String, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        // First occurrence wins when a sheet repeats a column.
        positions.entry(normalize_header(header)).or_insert(index);
    }

    let field = |record: &csv::StringRecord, keys: &[&str]| -> String {
        keys.iter()
            .filter_map(|key| positions.get(*key))
            .filter_map(|&index| record.get(index))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or("")
            .to_owned()
    };

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|error| PortError::InvalidResponse(error.to_string()))?;

        if row.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        records.push(RawEventRecord {
            id: format!("event-{index}"),
            municipality: field(&row, &["comune"]),
            title: field(&row, &["evento"]),
            category: field(&row, &["tipologia"]),
            recurrence: field(&row, &["giorno ricorrente", "giorno"]),
            start_text: field(&row, &["data inizio"]),
            end_text: field(&row, &["data fine"]),
            month_text: field(&row, &["mese"]),
            time_text: field(&row, &["orario"]),
            location: field(&row, &["luogo"]),
            organizer: field(&row, &["organizzatore"]),
            sectors: field(&row, &["settori merceologici"]),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bancarella_core::catalog::build_catalog;
    use chrono::NaiveDate;

    #[test]
    fn parses_rows_with_variant_headers() {
        let body = "Comune,Evento,Tipologia,Giorno ricorrente,Data Inizio,data fine,Orario\n\
                    Ventimiglia,Mercato del venerdì,Mercato,venerdì,ricorrente,,08:00-14:00\n\
                    VENTIMIGLIA,00 Mercatino,Mercato,,15/03,,\n";
        let records = parse_rows(body).expect("valid csv");
        assert_eq!(records.len(), 2);

        let weekly = records.first().expect("row");
        assert_eq!(weekly.id, "event-0");
        assert_eq!(weekly.recurrence, "venerdì");
        assert_eq!(weekly.start_text, "ricorrente");
        assert_eq!(weekly.time_text, "08:00-14:00");

        let one_off = records.get(1).expect("row");
        assert_eq!(one_off.municipality, "VENTIMIGLIA");
        assert_eq!(one_off.start_text, "15/03");
    }

    #[test]
    fn missing_columns_default_to_empty() {
        let body = "Comune,Evento\nVentimiglia,Sagra\n";
        let records = parse_rows(body).expect("valid csv");
        let row = records.first().expect("row");
        assert_eq!(row.title, "Sagra");
        assert!(row.start_text.is_empty());
        assert!(row.organizer.is_empty());
    }

    #[test]
    fn short_day_header_variant_is_accepted() {
        let body = "comune,evento,giorno\nVentimiglia,Antiquariato,sabato\n";
        let records = parse_rows(body).expect("valid csv");
        assert_eq!(records.first().expect("row").recurrence, "sabato");
    }

    #[test]
    fn blank_rows_are_skipped() {
        let body = "Comune,Evento\nVentimiglia,Sagra\n,\n";
        let records = parse_rows(body).expect("valid csv");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn sheet_row_flows_through_the_catalog() {
        let body = "Comune,Evento,Tipologia,Data inizio\n\
                    VENTIMIGLIA,00 Mercatino,Mercato,15/03\n";
        let records = parse_rows(body).expect("valid csv");
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");

        let occurrences = build_catalog(&records, reference);
        let mercatino = occurrences
            .iter()
            .find(|occurrence| occurrence.title == "Mercatino")
            .expect("sheet occurrence");
        assert_eq!(
            mercatino.start,
            NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
        );
    }
}

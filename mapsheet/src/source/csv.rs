//! CSV sheet parser
//!
//! Turns exported CSV text into rows. Header names are normalised the way the
//! spreadsheet feed names its columns: lowercased with everything but ASCII
//! letters and digits removed, so `Icon Url` becomes `iconurl`.

use mapsheet_common::Row;

use super::{Sheet, SourceError};

/// Normalise a header cell into a column key.
pub fn column_key(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parse a CSV document into a sheet.
///
/// Rows with every cell empty are dropped; short rows are padded with
/// empty cells.
pub fn parse_sheet(name: &str, content: &str) -> Result<Sheet, SourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow variable number of fields
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(column_key).collect();

    let mut elements = Vec::new();
    let mut skipped = 0;

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            skipped += 1;
            continue;
        }

        let row: Row = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !column.is_empty())
            .map(|(i, column)| (column.clone(), record.get(i).unwrap_or_default().to_string()))
            .collect();
        elements.push(row);
    }

    tracing::debug!(
        "Parsed sheet '{}': {} rows, {} blank rows skipped",
        name,
        elements.len(),
        skipped
    );

    Ok(Sheet {
        name: name.to_string(),
        elements,
    })
}

//! Bet file ingestion.
//!
//! Agency bet files are header-less CSV with one bet per line:
//! `name,last_name,national_id,birth_date,bet_number`.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{BetwireError, Result};
use crate::protocol::BetRecord;

/// One bet row as it appears in the file, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBetRow {
    pub name: String,
    pub last_name: String,
    pub national_id: String,
    pub birth_date: String,
    pub bet_number: String,
}

impl RawBetRow {
    /// Build a record for `house_id` from this row.
    ///
    /// Fails with [`BetwireError::Decoding`] when a numeric column does not
    /// parse as a 32-bit unsigned integer. Field widths are checked later,
    /// at [`BetRecord::encode`].
    pub fn to_record(&self, house_id: u8) -> Result<BetRecord> {
        Ok(BetRecord {
            house_id,
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            national_id: parse_u32("national_id", &self.national_id)?,
            birth_date: self.birth_date.clone(),
            bet_number: parse_u32("bet_number", &self.bet_number)?,
        })
    }
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| BetwireError::Decoding(format!("Field `{}` ({:?}): {}", field, raw, e)))
}

/// Read every row from a CSV source.
pub fn read_rows<R: Read>(source: R) -> Result<Vec<RawBetRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read every row from the CSV file at `path`.
pub fn read_rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawBetRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows = read_rows(file)?;
    debug!(path = %path.as_ref().display(), rows = rows.len(), "Loaded bet file");
    Ok(rows)
}

/// Convert rows into records for `house_id`.
///
/// Rows with unparsable numeric columns are skipped and logged; the second
/// element of the result is how many were skipped.
pub fn records_from_rows(house_id: u8, rows: &[RawBetRow]) -> (Vec<BetRecord>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for (line, row) in rows.iter().enumerate() {
        match row.to_record(house_id) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(line = line + 1, "Skipping bet row: {}", e);
            }
        }
    }

    (records, skipped)
}

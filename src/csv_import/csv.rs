//! Functions to parse transaction rows from CSV files.
//!
//! Files are expected to have a header row followed by rows with the columns
//! title, type, value and category, in that order.

use std::{io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    Error,
    category::CategoryTitle,
    transaction::{TransactionType, validate_value},
};

/// A validated row from a CSV file that is ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    /// A text description of what the transaction was for.
    pub title: String,
    /// Whether the money was earned or spent.
    pub transaction_type: TransactionType,
    /// The amount of money earned or spent.
    pub value: f64,
    /// The title of the category the transaction belongs to.
    pub category: CategoryTitle,
}

/// Read the transaction rows from the CSV file at `path`.
///
/// Rows that are incomplete or contain an invalid type or value are skipped.
///
/// # Errors
/// This function will return a:
/// - [Error::FileIo] if the file could not be opened or read,
/// - or [Error::InvalidCSV] if the file is not valid delimited text, e.g. it
///   contains invalid UTF-8.
pub fn parse_csv_file(path: &Path) -> Result<Vec<ImportRow>, Error> {
    let file = std::fs::File::open(path)?;

    parse_csv(file)
}

/// Read the transaction rows from `reader`.
///
/// The first line is treated as a header and ignored. Every cell is trimmed
/// and short rows are treated as having empty cells.
///
/// # Errors
/// This function will return an [Error::InvalidCSV] if the text could not be
/// read as CSV, or [Error::FileIo] if reading from `reader` fails.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<ImportRow>, Error> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;

        // Add one for the header and one for one-based line numbers.
        let line_number = index + 2;

        match parse_record(&record) {
            Some(row) => rows.push(row),
            None => tracing::debug!("Skipping invalid CSV row on line {line_number}: {record:?}"),
        }
    }

    Ok(rows)
}

fn parse_record(record: &StringRecord) -> Option<ImportRow> {
    let title = non_empty_cell(record, 0)?;
    let transaction_type = non_empty_cell(record, 1)?.parse().ok()?;
    let value = non_empty_cell(record, 2)?.parse::<f64>().ok()?;
    let value = validate_value(value).ok()?;
    let category = CategoryTitle::new(non_empty_cell(record, 3)?).ok()?;

    Some(ImportRow {
        title: title.to_owned(),
        transaction_type,
        value,
        category,
    })
}

fn non_empty_cell(record: &StringRecord, index: usize) -> Option<&str> {
    record.get(index).filter(|cell| !cell.is_empty())
}

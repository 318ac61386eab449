//! Bulk import of transactions from CSV files.

mod csv;
mod import_transactions;

pub use import_transactions::{import_transactions_endpoint, import_transactions_from_file};

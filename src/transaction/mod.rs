//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for saving transactions
//! - The creation flow that checks the balance and resolves categories
//! - Database functions for storing, querying, and deleting transactions
//! - Route handlers for the transaction API

mod core;
mod create;
mod create_endpoint;
mod delete_endpoint;
mod list_endpoint;

pub use self::core::{
    Transaction, TransactionBuilder, TransactionId, TransactionType, create_transaction_table,
    delete_transaction, get_all_transactions, insert_transactions, validate_value,
};
pub use create::{NewTransaction, create_transaction};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;

#[cfg(test)]
pub use self::core::{count_transactions, get_transaction, insert_transaction};

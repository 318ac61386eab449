//! Defines the endpoint for listing transactions together with the balance.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    balance::{Balance, get_balance},
    transaction::{Transaction, get_all_transactions},
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Every transaction and the balance they add up to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionList {
    /// All transactions, oldest first.
    pub transactions: Vec<Transaction>,
    /// The balance over all transactions.
    pub balance: Balance,
}

/// A route handler that returns all transactions and the current balance.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
) -> Result<Json<TransactionList>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let transactions = get_all_transactions(&connection)?;
    let balance = get_balance(&connection)?;

    Ok(Json(TransactionList {
        transactions,
        balance,
    }))
}

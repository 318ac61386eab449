//! The running balance, derived from all recorded transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// The sums of income and outcome transactions and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of all income values.
    pub income: f64,
    /// The sum of all outcome values.
    pub outcome: f64,
    /// `income - outcome`.
    pub total: f64,
}

/// Compute the balance over every transaction in the database.
///
/// The balance is not stored, it is calculated on demand with a single
/// aggregate query. An empty database has a balance of zero.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_balance(connection: &Connection) -> Result<Balance, Error> {
    let (income, outcome): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type = 'income' THEN value END), 0.0),
            COALESCE(SUM(CASE WHEN type = 'outcome' THEN value END), 0.0)
         FROM \"transaction\";",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Balance {
        income,
        outcome,
        total: income - outcome,
    })
}

/// The state needed to report the balance.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the current balance.
pub async fn get_balance_endpoint(
    State(state): State<BalanceState>,
) -> Result<Json<Balance>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_balance(&connection).map(Json)
}

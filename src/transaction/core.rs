//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, map_category_row_with_offset},
    database_id::DatabaseId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

/// Whether a transaction adds money to the balance or takes money out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned, adds to the balance.
    Income,
    /// Money spent, subtracts from the balance.
    Outcome,
}

impl TransactionType {
    /// The literal used for this type in requests, CSV files and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Outcome => "outcome",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Parse a transaction type from exactly "income" or "outcome".
    ///
    /// # Errors
    /// Returns [Error::InvalidTransactionType] for any other string, including
    /// differently cased versions of the two literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "outcome" => Ok(TransactionType::Outcome),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An income or outcome recorded against a category.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub title: String,
    /// The amount of money earned or spent, never negative.
    pub value: f64,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category the transaction belongs to.
    pub category: Category,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        title: &str,
        value: f64,
        transaction_type: TransactionType,
        category: Category,
    ) -> TransactionBuilder {
        TransactionBuilder {
            title: title.to_owned(),
            value,
            transaction_type,
            category,
        }
    }
}

/// A transaction that has not been saved to the database yet.
///
/// The category must already exist in the database.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// A text description of what the transaction was for.
    pub title: String,
    /// The amount of money earned or spent.
    pub value: f64,
    /// Whether the money was earned or spent.
    pub transaction_type: TransactionType,
    /// The saved category the transaction belongs to.
    pub category: Category,
}

/// Check that `value` can be used as a transaction value.
///
/// # Errors
/// Returns [Error::InvalidValue] if `value` is negative, infinite or NaN.
pub fn validate_value(value: f64) -> Result<f64, Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidValue(value))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const INSERT_TRANSACTION_SQL: &str = "INSERT INTO \"transaction\" (title, value, type, category_id, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     RETURNING id, created_at, updated_at";

const SELECT_TRANSACTION_SQL: &str = "SELECT t.id, t.title, t.value, t.type, t.created_at, t.updated_at,
            c.id, c.title, c.created_at, c.updated_at
     FROM \"transaction\" t
     INNER JOIN category c ON c.id = t.category_id";

/// Save a new transaction to the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if the category does not
/// exist or there is some other SQL error.
pub fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut stmt = connection.prepare(INSERT_TRANSACTION_SQL)?;

    insert_with_statement(builder, &mut stmt, OffsetDateTime::now_utc())
}

/// Save many new transactions to the database and return them in the same order.
///
/// The insert statement is prepared once and reused for every transaction.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// This function will return a [Error::SqlError] if any insert fails.
pub fn insert_transactions(
    builders: Vec<TransactionBuilder>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let now = OffsetDateTime::now_utc();
    let mut stmt = connection.prepare(INSERT_TRANSACTION_SQL)?;
    let mut transactions = Vec::with_capacity(builders.len());

    for builder in builders {
        transactions.push(insert_with_statement(builder, &mut stmt, now)?);
    }

    Ok(transactions)
}

fn insert_with_statement(
    builder: TransactionBuilder,
    stmt: &mut rusqlite::Statement<'_>,
    now: OffsetDateTime,
) -> Result<Transaction, Error> {
    let (id, created_at, updated_at): (TransactionId, OffsetDateTime, OffsetDateTime) = stmt
        .query_row(
            (
                &builder.title,
                builder.value,
                builder.transaction_type,
                builder.category.id,
                now,
                now,
            ),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

    Ok(Transaction {
        id,
        title: builder.title,
        value: builder.value,
        transaction_type: builder.transaction_type,
        category: builder.category,
        created_at,
        updated_at,
    })
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
#[cfg(test)]
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!("{SELECT_TRANSACTION_SQL} WHERE t.id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve every transaction with its category, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION_SQL} ORDER BY t.id ASC"))?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Delete the transaction with the given `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// The category table must be created first.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            value REAL NOT NULL CHECK (value >= 0),
            type TEXT NOT NULL CHECK (type IN ('income', 'outcome')),
            category_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_type ON \"transaction\"(type);",
    )?;

    Ok(())
}

/// Map a joined transaction and category row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let title = row.get(1)?;
    let value = row.get(2)?;
    let transaction_type = row.get(3)?;
    let created_at = row.get(4)?;
    let updated_at = row.get(5)?;
    let category = map_category_row_with_offset(row, 6)?;

    Ok(Transaction {
        id,
        title,
        value,
        transaction_type,
        category,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

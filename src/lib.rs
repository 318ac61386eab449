//! Ledger is a small bookkeeping service for recording income and outcome
//! transactions against categories.
//!
//! This library provides a JSON REST API for creating and listing
//! transactions, reporting the running balance and bulk importing
//! transactions from CSV files.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod balance;
mod category;
mod csv_import;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod routing;
mod transaction;
mod upload;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use balance::{Balance, get_balance};
pub use category::{Category, CategoryId, CategoryTitle, get_all_categories};
pub use csv_import::import_transactions_from_file;
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use transaction::{
    NewTransaction, Transaction, TransactionId, TransactionType, create_transaction,
    get_all_transactions,
};
pub use upload::{UploadDirectory, remove_upload};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The transaction type was something other than "income" or "outcome".
    #[error("the transaction type \"{0}\" is invalid, expected \"income\" or \"outcome\"")]
    InvalidTransactionType(String),

    /// An outcome was larger than the current balance.
    ///
    /// An outcome equal to the balance is allowed and leaves a zero balance.
    #[error("insufficient balance: the balance is {balance} but the outcome is {requested}")]
    InsufficientBalance {
        /// The total balance at the time of the request.
        balance: f64,
        /// The value of the rejected outcome.
        requested: f64,
    },

    /// An empty string was used as a transaction title.
    #[error("transaction title cannot be empty")]
    EmptyTransactionTitle,

    /// An empty string was used as a category title.
    #[error("category title cannot be empty")]
    EmptyCategoryTitle,

    /// The transaction value was negative, infinite or NaN.
    #[error("{0} is not a valid transaction value, values must be zero or greater")]
    InvalidValue(f64),

    /// The request body could not be parsed, e.g. a field was missing or had the wrong type.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// The request body was larger than the server accepts.
    #[error("the request body is larger than the limit of {0} bytes")]
    PayloadTooLarge(usize),

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// A field in the multipart form was not a CSV file.
    #[error("file is not a CSV")]
    NotCSV,

    /// The multipart form did not contain any files.
    #[error("no CSV file was uploaded")]
    MissingUpload,

    /// The CSV file could not be read as delimited text.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// A file could not be read, written or created.
    ///
    /// The string holds the underlying I/O error message.
    #[error("file error: {0}")]
    FileIo(String),

    /// An imported row referenced a category that could not be resolved.
    ///
    /// Categories are created for every title in the import before
    /// transactions are saved, so this indicates a bug rather than bad input.
    #[error("could not resolve the category \"{0}\"")]
    UnresolvedCategory(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_error) => Error::FileIo(io_error.to_string()),
            _ => Error::InvalidCSV(error.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileIo(error.to_string())
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl Error {
    /// The HTTP status code the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidTransactionType(_)
            | Error::InsufficientBalance { .. }
            | Error::EmptyTransactionTitle
            | Error::EmptyCategoryTitle
            | Error::InvalidValue(_)
            | Error::InvalidRequestBody(_)
            | Error::MultipartError(_)
            | Error::NotCSV
            | Error::MissingUpload
            | Error::InvalidCSV(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound | Error::DeleteMissingTransaction => StatusCode::NOT_FOUND,
            Error::UnresolvedCategory(_)
            | Error::FileIo(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            // Internal errors are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}

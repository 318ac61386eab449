//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    transaction::{NewTransaction, create_transaction},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new transaction.
///
/// Responds with 201 Created and the saved transaction as JSON.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(new_transaction) = payload.map_err(|rejection| {
        tracing::debug!("Rejected transaction body: {rejection}");
        Error::InvalidRequestBody(rejection.body_text())
    })?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let tx = connection
        .unchecked_transaction()
        .inspect_err(|error| tracing::error!("could not start transaction: {error}"))?;

    let transaction = create_transaction(new_transaction, &tx)
        .inspect_err(|error| tracing::debug!("could not create transaction: {error}"))?;

    tx.commit()
        .inspect_err(|error| tracing::error!("could not commit transaction: {error}"))?;

    tracing::info!(
        "Created {} transaction {} for {}",
        transaction.transaction_type,
        transaction.id,
        transaction.value
    );

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        test_utils::parse_json_body,
        transaction::{
            NewTransaction, count_transactions, create_endpoint::CreateTransactionState,
            create_transaction_endpoint, get_transaction,
        },
    };

    fn get_test_state() -> CreateTransactionState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        CreateTransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn new_transaction(value: f64, transaction_type: &str) -> NewTransaction {
        NewTransaction {
            title: "test transaction".to_owned(),
            value,
            transaction_type: transaction_type.to_owned(),
            category: "Tests".to_owned(),
        }
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let state = get_test_state();

        let response = create_transaction_endpoint(
            State(state.clone()),
            Ok(Json(new_transaction(12.3, "income"))),
        )
        .await
        .expect("Could not create transaction");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = parse_json_body(response).await;
        assert_eq!(body["type"], "income");
        assert_eq!(body["value"], 12.3);
        assert_eq!(body["category"]["title"], "Tests");

        // We know the first transaction will have ID 1
        let connection = state.db_connection.lock().unwrap();
        let transaction = get_transaction(1, &connection).unwrap();
        assert_eq!(transaction.value, 12.3);
        assert_eq!(transaction.title, "test transaction");
    }

    #[tokio::test]
    async fn rejects_invalid_type() {
        let state = get_test_state();

        let result = create_transaction_endpoint(
            State(state.clone()),
            Ok(Json(new_transaction(12.3, "gift"))),
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidTransactionType("gift".to_owned())
        );
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[tokio::test]
    async fn rejects_outcome_without_balance() {
        let state = get_test_state();

        let result = create_transaction_endpoint(
            State(state.clone()),
            Ok(Json(new_transaction(1.0, "outcome"))),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::InsufficientBalance { .. })
        ));
    }
}

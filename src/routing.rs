//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use crate::{
    AppState, Error,
    balance::get_balance_endpoint,
    category::list_categories_endpoint,
    csv_import::import_transactions_endpoint,
    endpoints,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
    },
};

/// The largest multipart form, in bytes, accepted by the import route.
pub(crate) const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(
            endpoints::IMPORT,
            post(import_transactions_endpoint).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(endpoints::CATEGORIES, get(list_categories_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Respond to requests for unknown routes with a JSON 404 error.
async fn get_404_not_found() -> Error {
    Error::NotFound
}

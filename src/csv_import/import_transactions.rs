use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, CategoryTitle, create_categories, get_categories_by_titles},
    csv_import::csv::{ImportRow, parse_csv_file},
    transaction::{Transaction, TransactionBuilder, insert_transactions},
    upload::{UploadDirectory, remove_upload},
};

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where uploaded files are kept until they are imported.
    pub upload_dir: UploadDirectory,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// Route handler for importing transactions from CSV files.
///
/// Every file in the multipart form is stored in the upload directory and then
/// imported. Responds with 201 Created and the imported transactions as JSON.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::debug!("Could not read multipart form: {error}");
        Error::MultipartError(error.body_text())
    })? {
        let (file_name, data) = parse_multipart_field(field).await?;
        tracing::debug!("Received file '{}' ({} bytes)", file_name, data.len());
        files.push((file_name, data));
    }

    if files.is_empty() {
        return Err(Error::MissingUpload);
    }

    let mut upload_paths: Vec<PathBuf> = Vec::with_capacity(files.len());

    for (file_name, data) in &files {
        match state.upload_dir.store(file_name, data) {
            Ok(path) => upload_paths.push(path),
            Err(error) => {
                tracing::error!("Could not store upload '{file_name}': {error}");
                upload_paths.iter().for_each(|path| remove_upload(path));
                return Err(error);
            }
        }
    }

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let mut imported_transactions = Vec::new();

    for (index, path) in upload_paths.iter().enumerate() {
        match import_transactions_from_file(path, &connection) {
            Ok(transactions) => imported_transactions.extend(transactions),
            Err(error) => {
                tracing::debug!("Failed to import {}: {error}", path.display());
                upload_paths[index..].iter().for_each(|path| remove_upload(path));
                return Err(error);
            }
        }
    }

    Ok((StatusCode::CREATED, Json(imported_transactions)).into_response())
}

async fn parse_multipart_field(field: Field<'_>) -> Result<(String, Vec<u8>), Error> {
    let file_name = field.file_name().map(ToOwned::to_owned);
    let is_csv_name = file_name
        .as_deref()
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));

    if field.content_type() != Some("text/csv") && !is_csv_name {
        tracing::debug!(
            "Rejected multipart field '{}' with content type {:?}",
            field.name().unwrap_or_default(),
            field.content_type()
        );
        return Err(Error::NotCSV);
    }

    let file_name = file_name.unwrap_or_else(|| "upload.csv".to_owned());

    let data = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })?;

    Ok((file_name, data.to_vec()))
}

/// Import the transactions in the CSV file at `path`.
///
/// The categories named in the file are looked up with a single query and any
/// missing ones are created before the transactions are saved. Everything is
/// saved in one SQL transaction and the file is deleted once the import has
/// been committed. Imported outcomes are not checked against the balance.
///
/// Returns the saved transactions in file order.
///
/// # Errors
/// This function will return a:
/// - [Error::FileIo] if the file could not be read,
/// - [Error::InvalidCSV] if the file is not valid CSV,
/// - [Error::UnresolvedCategory] if a row's category could not be found or created,
/// - or [Error::SqlError] if there is some SQL error.
///
/// Nothing is saved and the file is kept if an error is returned.
pub fn import_transactions_from_file(
    path: &Path,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let start_time = std::time::Instant::now();
    let rows = parse_csv_file(path)?;

    let tx = connection
        .unchecked_transaction()
        .inspect_err(|error| tracing::error!("could not start transaction: {error}"))?;

    let categories = resolve_categories(&rows, &tx)?;
    let builders = rows
        .into_iter()
        .map(|row| {
            let category = categories
                .get(&row.category)
                .cloned()
                .ok_or_else(|| Error::UnresolvedCategory(row.category.to_string()))?;

            Ok(Transaction::build(
                &row.title,
                row.value,
                row.transaction_type,
                category,
            ))
        })
        .collect::<Result<Vec<TransactionBuilder>, Error>>()?;

    let transactions = insert_transactions(builders, &tx)?;

    tx.commit()
        .inspect_err(|error| tracing::error!("could not commit transaction: {error}"))?;

    tracing::info!(
        "Imported {} transactions from {} in {}ms",
        transactions.len(),
        path.display(),
        start_time.elapsed().as_millis()
    );

    remove_upload(path);

    Ok(transactions)
}

/// Map every category title used in `rows` to a saved category, creating the
/// categories that do not exist yet.
fn resolve_categories(
    rows: &[ImportRow],
    connection: &Connection,
) -> Result<HashMap<CategoryTitle, Category>, Error> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();

    for row in rows {
        if seen.insert(&row.category) {
            titles.push(row.category.clone());
        }
    }

    let existing = get_categories_by_titles(&titles, connection)?;
    let existing_titles: HashSet<&CategoryTitle> =
        existing.iter().map(|category| &category.title).collect();

    let missing: Vec<CategoryTitle> = titles
        .iter()
        .filter(|title| !existing_titles.contains(title))
        .cloned()
        .collect();

    if !missing.is_empty() {
        tracing::debug!("Creating {} new categories", missing.len());
    }

    let created = create_categories(&missing, connection)?;

    Ok(existing
        .into_iter()
        .chain(created)
        .map(|category| (category.title.clone(), category))
        .collect())
}

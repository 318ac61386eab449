//! Implements a struct that holds the state of the REST server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{Error, db::initialize, upload::UploadDirectory};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Where uploaded CSV files are stored until they are imported.
    pub upload_dir: UploadDirectory,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models and create `upload_dir` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the upload
    /// directory cannot be created.
    pub fn new(db_connection: Connection, upload_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            db_connection: connection,
            upload_dir: UploadDirectory::new(upload_dir)?,
        })
    }
}

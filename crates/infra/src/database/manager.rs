//! Database connection manager backed by an r2d2 SQLite pool.
//!
//! The main database file holds schema `main`. Any other configured schema is
//! attached on every pooled connection from a sibling file named
//! `<schema>.db`, so tables can be addressed as `"schema"."table"`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use restsync_domain::{DatabaseConfig, Result, SyncError};
use rusqlite::params;
use tracing::{info, warn};

use super::upsert_store::quote_identifier;
use crate::errors::to_sync_error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an r2d2 pool.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
    schema: String,
}

impl DbManager {
    /// Create a manager for the configured database.
    ///
    /// # Errors
    /// Returns `SyncError::Persistence` if the pool cannot open a first
    /// connection (missing directory, unreadable file, failed attach).
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = PathBuf::from(&config.database);
        let schema = config.schema().to_owned();
        let attach = attached_schema_path(&path, &schema);

        // pool construction retries a failing open until CONNECTION_TIMEOUT
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(SyncError::Persistence(format!(
                    "database directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        if let Some(server) = &config.server {
            info!(server = %server, "database.server is informational for the SQLite store");
        }

        let attach_for_init = attach.clone();
        let schema_for_init = schema.clone();
        let manager = SqliteConnectionManager::file(&path).with_init(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            if let Some(attach_path) = &attach_for_init {
                conn.execute(
                    &format!("ATTACH DATABASE ?1 AS {}", quote_identifier(&schema_for_init)),
                    params![attach_path.to_string_lossy().into_owned()],
                )?;
            }
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.pool_size().max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|err| {
                warn!(db_path = %path.display(), error = %err, "Failed to create connection pool");
                SyncError::Persistence(format!(
                    "failed to open database {}: {err}",
                    path.display()
                ))
            })?;

        info!(
            db_path = %path.display(),
            schema = %schema,
            attached = attach.is_some(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path, schema })
    }

    /// Acquire a connection from the pool. Released on drop.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(to_sync_error)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema that destination tables live in.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Perform a health check to verify database connectivity.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(to_sync_error)?;
        Ok(())
    }
}

/// File to attach for a non-default schema, next to the main database.
fn attached_schema_path(main: &Path, schema: &str) -> Option<PathBuf> {
    if schema.eq_ignore_ascii_case("main") || schema.eq_ignore_ascii_case("temp") {
        return None;
    }
    let file = format!("{schema}.db");
    Some(match main.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file),
        _ => PathBuf::from(file),
    })
}

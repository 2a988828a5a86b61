//! SQLite persistence

pub mod manager;
pub mod upsert_store;

pub use manager::{DbManager, SqliteConnection};
pub use upsert_store::{quote_identifier, SqliteUpsertStore};

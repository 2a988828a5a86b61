//! SQLite upsert store
//!
//! Projects each record onto the destination columns of its entity's field
//! mapping and writes it keyed on the natural identifier `id`: an existing
//! row is updated, otherwise a new row is inserted. A batch runs in one
//! transaction; every record gets its own savepoint so a failing record is
//! rolled back and reported without affecting the others.

use std::sync::Arc;

use async_trait::async_trait;
use restsync_core::UpsertStore;
use restsync_domain::constants::{is_excluded_column, NATURAL_KEY_COLUMN};
use restsync_domain::{
    FieldMapping, FieldValue, Record, RecordFailure, Result, SyncError, TableMapping, UpsertReport,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tokio::task;
use tracing::{debug, error, info};

use super::manager::DbManager;
use crate::errors::to_sync_error;

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Store value for a field. Lists and maps are stored as JSON text.
fn to_sql_value(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Null => SqlValue::Null,
        FieldValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        FieldValue::Integer(i) => SqlValue::Integer(*i),
        FieldValue::Float(f) => SqlValue::Real(*f),
        FieldValue::Text(s) => SqlValue::Text(s.clone()),
        nested @ (FieldValue::List(_) | FieldValue::Map(_)) => {
            SqlValue::Text(nested.to_json().to_string())
        }
    }
}

/// Statements and column layout for one entity's batch.
#[derive(Debug, Clone)]
struct UpsertPlan {
    /// Destination column and source field, system columns removed.
    columns: Vec<(String, String)>,
    skipped: Vec<String>,
    key_index: Option<usize>,
    select_sql: String,
    update_sql: Option<String>,
    insert_sql: String,
}

impl UpsertPlan {
    fn new(schema: &str, entity: &str, mapping: &FieldMapping) -> Self {
        let table = format!("{}.{}", quote_identifier(schema), quote_identifier(entity));

        let mut columns = Vec::with_capacity(mapping.len());
        let mut skipped = Vec::new();
        for (column, source) in mapping {
            if is_excluded_column(column) {
                skipped.push(column.clone());
            } else {
                columns.push((column.clone(), source.clone()));
            }
        }

        let key_index =
            columns.iter().position(|(column, _)| column.eq_ignore_ascii_case(NATURAL_KEY_COLUMN));
        let key_column = key_index
            .map_or_else(|| quote_identifier(NATURAL_KEY_COLUMN), |i| quote_identifier(&columns[i].0));

        let select_sql = format!("SELECT 1 FROM {table} WHERE {key_column} = ?1 LIMIT 1");

        // update parameters are every non-key column in order, then the key
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != key_index)
            .enumerate()
            .map(|(param, (_, (column, _)))| format!("{} = ?{}", quote_identifier(column), param + 1))
            .collect();
        let update_sql = (!assignments.is_empty()).then(|| {
            format!(
                "UPDATE {table} SET {} WHERE {key_column} = ?{}",
                assignments.join(", "),
                assignments.len() + 1
            )
        });

        let column_list: Vec<String> = columns.iter().map(|(c, _)| quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let insert_sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            column_list.join(", "),
            placeholders.join(", ")
        );

        Self { columns, skipped, key_index, select_sql, update_sql, insert_sql }
    }

    /// Values in column order. Absent source fields become NULL.
    fn project(&self, record: &Record) -> Vec<FieldValue> {
        self.columns
            .iter()
            .map(|(_, source)| record.get(source).cloned().unwrap_or_default())
            .collect()
    }

    /// Write one projected record, returning the affected row count.
    fn apply(&self, conn: &Connection, values: &[FieldValue]) -> Result<usize> {
        let Some(key_index) = self.key_index else {
            return Err(SyncError::Persistence(format!(
                "mapping has no '{NATURAL_KEY_COLUMN}' column"
            )));
        };
        let key = &values[key_index];
        if key.is_null() {
            return Err(SyncError::Persistence(format!("record has a null '{NATURAL_KEY_COLUMN}'")));
        }
        let key_value = to_sql_value(key);

        let exists = conn
            .prepare_cached(&self.select_sql)
            .and_then(|mut stmt| stmt.query_row([&key_value], |_| Ok(())).optional())
            .map_err(to_sync_error)?
            .is_some();

        if exists {
            let Some(update_sql) = &self.update_sql else {
                return Ok(0);
            };
            let params = values
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != key_index)
                .map(|(_, value)| to_sql_value(value))
                .chain(std::iter::once(key_value));
            conn.prepare_cached(update_sql)
                .and_then(|mut stmt| stmt.execute(params_from_iter(params)))
                .map_err(to_sync_error)
        } else {
            conn.prepare_cached(&self.insert_sql)
                .and_then(|mut stmt| stmt.execute(params_from_iter(values.iter().map(to_sql_value))))
                .map_err(to_sync_error)
        }
    }
}

/// Upsert store writing into SQLite through [`DbManager`]
pub struct SqliteUpsertStore {
    db: Arc<DbManager>,
}

impl SqliteUpsertStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn execute_batch(
        db: &DbManager,
        entity: &str,
        plan: &UpsertPlan,
        records: &[Record],
    ) -> Result<UpsertReport> {
        let mut conn = db.get_connection()?;
        let mut tx = conn.transaction().map_err(to_sync_error)?;
        let mut report = UpsertReport { attempted: records.len(), ..UpsertReport::default() };

        for (index, record) in records.iter().enumerate() {
            let values = plan.project(record);
            let record_id = plan.key_index.and_then(|i| values[i].as_identifier());

            let savepoint = tx.savepoint().map_err(to_sync_error)?;
            match plan.apply(&savepoint, &values) {
                Ok(affected) => {
                    savepoint.commit().map_err(to_sync_error)?;
                    report.upserted += 1;
                    report.affected_rows += affected;
                }
                Err(err) => {
                    // dropping the savepoint rolls this record back
                    drop(savepoint);
                    error!(
                        entity,
                        index,
                        record_id = record_id.as_deref().unwrap_or("-"),
                        columns = plan.columns.len(),
                        error = %err,
                        "Failed to upsert record"
                    );
                    report.failures.push(RecordFailure { index, record_id, error: err });
                }
            }
        }

        tx.commit().map_err(to_sync_error)?;
        Ok(report)
    }
}

fn map_join_error(err: task::JoinError) -> SyncError {
    if err.is_cancelled() {
        SyncError::Internal("upsert task cancelled".into())
    } else {
        SyncError::Internal(format!("upsert task panic: {err}"))
    }
}

#[async_trait]
impl UpsertStore for SqliteUpsertStore {
    async fn upsert(
        &self,
        entity: &str,
        mapping: &TableMapping,
        records: Vec<Record>,
    ) -> Result<UpsertReport> {
        let field_mapping =
            mapping.get(entity).ok_or_else(|| SyncError::MappingMissing(entity.to_owned()))?;
        let plan = UpsertPlan::new(self.db.schema(), entity, field_mapping);

        if !plan.skipped.is_empty() {
            info!(entity, skipped = ?plan.skipped, "Skipping system-managed columns");
        }
        debug!(entity, records = records.len(), columns = plan.columns.len(), "Upserting batch");

        let db = Arc::clone(&self.db);
        let entity_name = entity.to_owned();
        let report = task::spawn_blocking(move || -> Result<UpsertReport> {
            Self::execute_batch(&db, &entity_name, &plan, &records)
        })
        .await
        .map_err(map_join_error)??;

        info!(
            entity,
            attempted = report.attempted,
            upserted = report.upserted,
            failures = report.failures.len(),
            "Upsert complete for {entity}: {} rows affected",
            report.affected_rows
        );
        Ok(report)
    }
}

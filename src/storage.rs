//! Snapshot reads: per-request connection and row shaping.

use std::path::Path;

use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row, SqliteConnection};

use crate::error_handling::QueryError;
use crate::query::{BuiltQuery, SqlParam};

/// Executes a built query against the snapshot at `db_path` and shapes the
/// rows into JSON objects keyed by the query's column names.
///
/// The connection is opened read-only per request rather than pooled: the
/// snapshot file is replaced by rename during a refresh, and a long-lived
/// pool would keep serving the old inode.
pub async fn run_query(db_path: &Path, built: &BuiltQuery) -> Result<Vec<Value>, QueryError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .disable_statement_logging();
    let mut conn = SqliteConnection::connect_with(&options).await?;

    let mut query = sqlx::query(&built.sql);
    for param in &built.params {
        query = match param {
            SqlParam::Int(i) => query.bind(i),
            SqlParam::Text(s) => query.bind(s),
        };
    }

    let rows = query.fetch_all(&mut conn).await?;
    conn.close().await?;

    let mut results = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut object = Map::with_capacity(built.columns.len());
        for (idx, column) in built.columns.iter().enumerate() {
            object.insert(column.clone(), column_value(row, idx));
        }
        results.push(Value::Object(object));
    }
    Ok(results)
}

/// Decodes one SQLite value into JSON without knowing the column type up
/// front. SQLite is dynamically typed per cell, so try the storage classes
/// in order: INTEGER, REAL, then TEXT.
fn column_value(row: &SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    row.try_get::<Option<String>, _>(idx)
        .ok()
        .flatten()
        .map(Value::from)
        .unwrap_or(Value::Null)
}

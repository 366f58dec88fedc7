pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Table names the facade accepts. Everything else is rejected before any SQL
/// is built.
pub const TABLES: &[&str] = &[
    "companies",
    "customers",
    "invoices",
    "invoice_items",
    "invoice_payments",
    "invoice_shares",
];

/// A schemaless row: one JSON object per record.
pub type Row = serde_json::Map<String, Value>;

/// Equality predicate on a top-level row field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("invalid field name: {0}")]
    InvalidField(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic interface to the table store. Rows are JSON objects; filters are
/// equality predicates combined with AND. Ownership keys (`user_id`,
/// `company_id`, `invoice_id`) are ordinary fields — callers are responsible
/// for always filtering by them.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Row>>;

    /// Inserts rows, assigning a UUID `id` to any row that lacks one.
    /// Returns the rows as stored.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>>;

    /// Merges `values` into every matching row. A `null` value removes the
    /// field. Returns the number of rows touched.
    async fn update(&self, table: &str, values: Row, filters: &[Filter]) -> StoreResult<u64>;

    /// Returns the number of rows removed. Zero matches is not an error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<u64>;

    /// Connectivity probe for the readiness endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

pub fn to_row<T: Serialize>(value: &T) -> StoreResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Encoding(serde::de::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        )))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Inserts one typed record, letting the store assign the id when the value
/// carries an empty one, and returns it as stored.
pub async fn insert_as<T>(store: &dyn DataStore, table: &str, value: &T) -> StoreResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut row = to_row(value)?;
    let blank_id = row
        .get("id")
        .and_then(Value::as_str)
        .map_or(true, str::is_empty);
    if blank_id {
        row.remove("id");
    }
    let stored = store.insert(table, vec![row]).await?;
    match stored.into_iter().next() {
        Some(row) => from_row(row),
        None => Err(StoreError::Encoding(serde::de::Error::custom(
            "insert returned no rows",
        ))),
    }
}

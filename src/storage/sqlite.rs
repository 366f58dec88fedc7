use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row as _, Sqlite};
use uuid::Uuid;

use super::{DataStore, Filter, Row, StoreError, StoreResult, TABLES};

/// SQLite-backed table store. Every entity table is a two-column
/// `(id TEXT PRIMARY KEY, data TEXT)` document table; filters are translated
/// to `json_extract` lookups on the stored JSON.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        // An in-memory database exists per connection, so the pool must not
        // hand out more than one.
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = options.connect(url).await?;
        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> StoreResult<()> {
        for table in TABLES {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, data TEXT NOT NULL)"
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

fn check_table(table: &str) -> StoreResult<()> {
    if TABLES.contains(&table) {
        Ok(())
    } else {
        Err(StoreError::UnknownTable(table.to_string()))
    }
}

fn check_field(field: &str) -> StoreResult<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) -> StoreResult<()> {
    for (i, filter) in filters.iter().enumerate() {
        check_field(&filter.field)?;
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(format!("json_extract(data, '$.{}') = ", filter.field));
        match &filter.value {
            Value::String(s) => {
                qb.push_bind(s.clone());
            }
            Value::Number(n) => {
                if let Some(int) = n.as_i64() {
                    qb.push_bind(int);
                } else {
                    qb.push_bind(n.as_f64().unwrap_or(0.0));
                }
            }
            Value::Bool(b) => {
                qb.push_bind(*b);
            }
            other => {
                qb.push_bind(other.to_string());
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Row>> {
        check_table(table)?;
        let mut qb = QueryBuilder::new(format!("SELECT data FROM {table}"));
        push_filters(&mut qb, filters)?;
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            match serde_json::from_str::<Value>(&data)? {
                Value::Object(map) => out.push(map),
                _ => {
                    return Err(StoreError::Encoding(serde::de::Error::custom(
                        "stored row is not a JSON object",
                    )))
                }
            }
        }
        Ok(out)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        check_table(table)?;
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id = match row.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    row.insert("id".to_string(), Value::String(id.clone()));
                    id
                }
            };
            let data = serde_json::to_string(&row)?;
            sqlx::query(&format!("INSERT INTO {table} (id, data) VALUES (?1, ?2)"))
                .bind(&id)
                .bind(&data)
                .execute(&self.pool)
                .await?;
            stored.push(row);
        }
        Ok(stored)
    }

    async fn update(&self, table: &str, values: Row, filters: &[Filter]) -> StoreResult<u64> {
        check_table(table)?;
        // json_patch merges the values; nulls remove the field, which is how
        // mark-unpaid clears payment_method/payment_remarks.
        let patch = serde_json::to_string(&values)?;
        let mut qb = QueryBuilder::new(format!("UPDATE {table} SET data = json_patch(data, "));
        qb.push_bind(patch);
        qb.push(")");
        push_filters(&mut qb, filters)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<u64> {
        check_table(table)?;
        let mut qb = QueryBuilder::new(format!("DELETE FROM {table}"));
        push_filters(&mut qb, filters)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

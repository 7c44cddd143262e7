use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{ContextId, RecordId},
    protocol::Record,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Fields of a record before the database has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub priority: i64,
    pub category: String,
    pub valid: bool,
    pub attributes: Map<String, Value>,
}

impl NewRecord {
    pub fn new(category: impl Into<String>, valid: bool, priority: i64) -> Self {
        Self {
            priority,
            category: category.into(),
            valid,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn insert_record(&self, context_id: ContextId, record: &NewRecord) -> Result<RecordId> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO records (context_id, priority, category, valid, attributes) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
        )
        .bind(context_id.0)
        .bind(record.priority)
        .bind(&record.category)
        .bind(record.valid)
        .bind(attributes)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert record for context {context_id}"))?;
        Ok(RecordId(id))
    }

    /// Summary rows for one context, in stored display order.
    pub async fn list_summary(&self, context_id: ContextId) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            "SELECT id, priority, category, valid, attributes FROM records WHERE context_id = ?1 ORDER BY priority, id",
        )
        .bind(context_id.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list records for context {context_id}"))?;

        rows.iter().map(record_from_row).collect()
    }

    pub async fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        let row = sqlx::query(
            "SELECT id, priority, category, valid, attributes FROM records WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Returns false when no record has this id.
    pub async fn update_priority(&self, id: RecordId, priority: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE records SET priority = ?1 WHERE id = ?2")
            .bind(priority)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update priority of record {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrites every field except the owning context. Returns false when no record has this id.
    pub async fn update_record(&self, record: &Record) -> Result<bool> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let result = sqlx::query(
            "UPDATE records SET priority = ?1, category = ?2, valid = ?3, attributes = ?4 WHERE id = ?5",
        )
        .bind(record.priority)
        .bind(&record.category)
        .bind(record.valid)
        .bind(attributes)
        .bind(record.id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update record {}", record.id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE id = ?1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete record {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let id: i64 = row.try_get("id")?;
    let raw_attributes: String = row.try_get("attributes")?;
    let attributes = match serde_json::from_str::<Value>(&raw_attributes)
        .with_context(|| format!("record {id} has unreadable attributes"))?
    {
        Value::Object(map) => map,
        other => return Err(anyhow!("record {id} attributes are not an object: {other}")),
    };

    Ok(Record {
        id: RecordId(id),
        priority: row.try_get("priority")?,
        category: row.try_get("category")?,
        valid: row.try_get("valid")?,
        attributes,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

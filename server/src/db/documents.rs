//! Database operations for the documents table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tote_engine::{Document, UserId};

/// A stored user document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    pub user_id: UserId,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DocumentRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(DocumentRow {
            user_id: row.try_get("user_id")?,
            data: row.try_get("data")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Get a user's document.
pub async fn get_document(pool: &PgPool, user_id: &str) -> Result<Option<DocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT user_id, data, updated_at
        FROM documents
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Merge top-level fields into a user's document, creating it if missing.
///
/// Fields absent from `fields` keep their stored value. The merge happens in
/// a single statement, so concurrent patches to different fields never
/// clobber each other.
pub async fn merge_document(
    pool: &PgPool,
    user_id: &str,
    fields: Document,
) -> Result<DocumentRow, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO documents (user_id, data, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (user_id) DO UPDATE SET
            data = documents.data || EXCLUDED.data,
            updated_at = now()
        RETURNING user_id, data, updated_at
        "#,
    )
    .bind(user_id)
    .bind(serde_json::Value::Object(fields))
    .fetch_one(pool)
    .await
}

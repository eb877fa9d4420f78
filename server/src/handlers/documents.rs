//! Document handlers - read and patch per-user documents.

use crate::db::{self, DocumentRow};
use crate::error::{AppError, Result};
use serde_json::Value;
use sqlx::PgPool;
use tote_engine::{CartItem, Document, ListItem, WishlistItem};

/// Fetch a user's document.
pub async fn handle_get(pool: &PgPool, user_id: &str) -> Result<DocumentRow> {
    db::get_document(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No document for user {}", user_id)))
}

/// Merge a patch into a user's document.
pub async fn handle_patch(pool: &PgPool, user_id: &str, body: Value) -> Result<DocumentRow> {
    let fields = validate_patch(body)?;
    let field_count = fields.len();

    let row = db::merge_document(pool, user_id, fields).await?;
    tracing::debug!(user = %user_id, fields = field_count, "Document patched");
    Ok(row)
}

/// Check a patch body before it reaches the database.
///
/// The body must be a JSON object. List fields must hold well-formed lists
/// (or null, which clears them).
pub fn validate_patch(body: Value) -> Result<Document> {
    let Value::Object(fields) = body else {
        return Err(AppError::BadRequest(
            "Document patch must be a JSON object".to_string(),
        ));
    };

    check_list::<CartItem>(&fields)?;
    check_list::<WishlistItem>(&fields)?;
    Ok(fields)
}

fn check_list<T: ListItem>(fields: &Document) -> Result<()> {
    let list = T::KIND;
    match fields.get(list.key()) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => {
            serde_json::from_value::<Vec<T>>(value.clone()).map_err(|e| {
                tote_engine::Error::MalformedData(format!("{}: {}", list, e))
            })?;
            Ok(())
        }
    }
}

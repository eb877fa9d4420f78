//! User document routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::db::DocumentRow;
use crate::error::Result;
use crate::handlers::{handle_get, handle_patch};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{user_id}", get(get_handler).patch(patch_handler))
}

/// GET /users/{user_id} - Fetch a user's document.
async fn get_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<DocumentRow>> {
    auth.authorize(&user_id)?;
    let row = handle_get(&state.pool, &user_id).await?;
    Ok(Json(row))
}

/// PATCH /users/{user_id} - Merge fields into a user's document.
async fn patch_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<DocumentRow>> {
    auth.authorize(&user_id)?;
    let row = handle_patch(&state.pool, &user_id, body).await?;
    Ok(Json(row))
}

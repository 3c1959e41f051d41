use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::collection::{
    Collection, CollectionListResponse, CollectionSummary, CollectionWithEntries,
    CreateCollectionRequest,
};
use crate::models::entry::{Entry, EntryView};
use crate::AppState;

pub async fn list_collections(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<CollectionListResponse>> {
    let collections = sqlx::query_as::<_, CollectionSummary>(
        r#"
        SELECT c.*, COUNT(e.id) AS entry_count
        FROM collections c
        LEFT JOIN entries e ON e.collection_id = c.id
        WHERE c.user_id = $1
        GROUP BY c.id
        ORDER BY c.name ASC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let unorganized_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM entries WHERE user_id = $1 AND collection_id IS NULL",
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(CollectionListResponse {
        collections,
        unorganized_count,
    }))
}

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateCollectionRequest>,
) -> AppResult<Json<Collection>> {
    body.validate()?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM collections WHERE user_id = $1 AND name = $2",
    )
    .bind(auth_user.id)
    .bind(name)
    .fetch_one(&state.db)
    .await?;

    if existing > 0 {
        return Err(duplicate_name());
    }

    let collection = sqlx::query_as::<_, Collection>(
        r#"
        INSERT INTO collections (id, user_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(name)
    .bind(body.description.as_deref().map(str::trim).filter(|d| !d.is_empty()))
    .fetch_one(&state.db)
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent create of the same name.
        sqlx::Error::Database(ref db) if db.is_unique_violation() => duplicate_name(),
        other => other.into(),
    })?;

    tracing::info!(user_id = %auth_user.id, collection_id = %collection.id, "Collection created");
    Ok(Json(collection))
}

pub async fn get_collection(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<CollectionWithEntries>> {
    let collection = sqlx::query_as::<_, Collection>(
        "SELECT * FROM collections WHERE id = $1 AND user_id = $2",
    )
    .bind(collection_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Collection not found".into()))?;

    let entries = sqlx::query_as::<_, Entry>(
        r#"
        SELECT * FROM entries
        WHERE collection_id = $1 AND user_id = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(collection_id)
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let entries = entries
        .into_iter()
        .map(|entry| EntryView::new(entry, Some(collection.name.clone())))
        .collect();

    Ok(Json(CollectionWithEntries {
        collection,
        entries,
    }))
}

/// Deleting a collection also deletes the entries filed under it.
pub async fn delete_collection(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM collections WHERE id = $1 AND user_id = $2")
        .bind(collection_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Collection not found".into()));
    }

    tracing::info!(user_id = %auth_user.id, collection_id = %collection_id, "Collection deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn duplicate_name() -> AppError {
    AppError::Conflict("A collection with this name already exists".into())
}

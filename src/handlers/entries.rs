use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::entry::{
    day_bounds, like_pattern, AnalyzeEntryRequest, AnalyzeEntryResponse, CollectionFilter,
    CreateEntryRequest, Entry, EntryQuery, EntryView, EntryWithCollection, MoodFields, SortOrder,
    UpdateEntryRequest,
};
use crate::services::mood::classify;
use crate::AppState;

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<EntryQuery>,
) -> AppResult<Json<Vec<EntryView>>> {
    let collection = CollectionFilter::parse(params.collection_id.as_deref())?;
    let order = SortOrder::parse(params.order.as_deref());

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"SELECT e.*, c.name AS collection_name
           FROM entries e
           LEFT JOIN collections c ON c.id = e.collection_id
           WHERE e.user_id = "#,
    );
    query.push_bind(auth_user.id);

    match collection {
        CollectionFilter::Any => {}
        CollectionFilter::Unorganized => {
            query.push(" AND e.collection_id IS NULL");
        }
        CollectionFilter::Collection(id) => {
            query.push(" AND e.collection_id = ").push_bind(id);
        }
    }

    if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        query
            .push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(mood) = params.mood.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        query.push(" AND e.mood = ").push_bind(mood.to_string());
    }

    if let Some(date) = params.date {
        let (start, end) = day_bounds(date, state.config.analytics_offset())?;
        query
            .push(" AND e.created_at >= ")
            .push_bind(start)
            .push(" AND e.created_at < ")
            .push_bind(end);
    }

    // Direction comes from a closed enum, never from the request text.
    query.push(" ORDER BY e.created_at ").push(order.as_sql());

    let rows = query
        .build_query_as::<EntryWithCollection>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(EntryView::from).collect()))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<EntryView>> {
    let row = sqlx::query_as::<_, EntryWithCollection>(
        r#"
        SELECT e.*, c.name AS collection_name
        FROM entries e
        LEFT JOIN collections c ON c.id = e.collection_id
        WHERE e.id = $1 AND e.user_id = $2
        "#,
    )
    .bind(entry_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Entry not found".into()))?;

    Ok(Json(row.into()))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateEntryRequest>,
) -> AppResult<Json<EntryView>> {
    body.validate()?;
    let collection_name = owned_collection_name(&state, auth_user.id, body.collection_id).await?;

    let mood = match body.manual_mood() {
        Some(mood) => mood,
        None => match state.llm.analyze_mood(&body.content).await {
            Ok(analysis) => MoodFields::from_analysis(analysis),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %auth_user.id, "Mood analysis failed, saving entry unscored");
                MoodFields::default()
            }
        },
    };

    let image_url = match mood.mood_query.as_deref() {
        Some(query) => state.images.find_image(query).await,
        None => None,
    };

    let entry = sqlx::query_as::<_, Entry>(
        r#"
        INSERT INTO entries (id, user_id, collection_id, title, content, mood, mood_score, mood_query, mood_image_url, mood_color, mood_emoji)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.collection_id)
    .bind(body.title.trim())
    .bind(&body.content)
    .bind(&mood.mood)
    .bind(mood.mood_score)
    .bind(&mood.mood_query)
    .bind(&image_url)
    .bind(&mood.mood_color)
    .bind(&mood.mood_emoji)
    .fetch_one(&state.db)
    .await?;

    // The editor draft has been published.
    if let Err(e) = sqlx::query("DELETE FROM drafts WHERE user_id = $1")
        .bind(auth_user.id)
        .execute(&state.db)
        .await
    {
        tracing::warn!(error = %e, user_id = %auth_user.id, "Failed to clear draft");
    }

    tracing::info!(
        user_id = %auth_user.id,
        entry_id = %entry.id,
        mood = ?entry.mood,
        score = ?entry.mood_score,
        "Entry created"
    );

    Ok(Json(EntryView::new(entry, collection_name)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<UpdateEntryRequest>,
) -> AppResult<Json<EntryView>> {
    body.validate()?;

    let existing = sqlx::query_as::<_, Entry>(
        "SELECT * FROM entries WHERE id = $1 AND user_id = $2",
    )
    .bind(entry_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Entry not found".into()))?;

    let collection_name = owned_collection_name(&state, auth_user.id, body.collection_id).await?;

    let mood = match body.manual_mood() {
        Some(mood) => mood,
        None if body.content != existing.content => {
            match state.llm.analyze_mood(&body.content).await {
                Ok(analysis) => MoodFields::from_analysis(analysis),
                Err(e) => {
                    tracing::warn!(error = %e, entry_id = %entry_id, "Mood re-analysis failed, keeping previous mood");
                    MoodFields::from_entry(&existing)
                }
            }
        }
        None => MoodFields::from_entry(&existing),
    };

    let image_url = if mood.mood != existing.mood {
        match mood.mood_query.as_deref() {
            Some(query) => state.images.find_image(query).await,
            None => None,
        }
    } else {
        existing.mood_image_url.clone()
    };

    let entry = sqlx::query_as::<_, Entry>(
        r#"
        UPDATE entries SET
            collection_id = $3,
            title = $4,
            content = $5,
            mood = $6,
            mood_score = $7,
            mood_query = $8,
            mood_image_url = $9,
            mood_color = $10,
            mood_emoji = $11,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(entry_id)
    .bind(auth_user.id)
    .bind(body.collection_id)
    .bind(body.title.trim())
    .bind(&body.content)
    .bind(&mood.mood)
    .bind(mood.mood_score)
    .bind(&mood.mood_query)
    .bind(&image_url)
    .bind(&mood.mood_color)
    .bind(&mood.mood_emoji)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Entry not found".into()))?;

    Ok(Json(EntryView::new(entry, collection_name)))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Entry not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Preview the mood analysis for editor content without saving anything.
pub async fn analyze_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<AnalyzeEntryRequest>,
) -> AppResult<Json<AnalyzeEntryResponse>> {
    body.validate()?;

    let analysis = state.llm.analyze_mood(&body.content).await?;
    tracing::debug!(user_id = %auth_user.id, mood = %analysis.mood, "Mood analysed");

    let category = classify(analysis.sentiment_score);
    Ok(Json(AnalyzeEntryResponse { analysis, category }))
}

/// Name of the target collection, after checking the caller owns it.
async fn owned_collection_name(
    state: &AppState,
    user_id: Uuid,
    collection_id: Option<Uuid>,
) -> AppResult<Option<String>> {
    let Some(collection_id) = collection_id else {
        return Ok(None);
    };

    let name = sqlx::query_scalar::<_, String>(
        "SELECT name FROM collections WHERE id = $1 AND user_id = $2",
    )
    .bind(collection_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Collection not found".into()))?;

    Ok(Some(name))
}

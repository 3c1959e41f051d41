use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::entry::Entry;
use crate::services::analytics::{MoodAggregator, Period};
use crate::services::entry_links::{html_to_text, render_entry_links, truncate_chars};
use crate::services::llm::PromptEntry;
use crate::AppState;

/// Plain-text budget per entry handed to the model.
const ENTRY_TEXT_LIMIT: usize = 1000;

pub const NO_ENTRIES_ANSWER: &str =
    "You don't have any journal entries in this period yet. Write a few entries and ask again.";

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 500, message = "Question must be 1-500 characters"))]
    pub question: String,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub referenced_entries: Vec<Uuid>,
    pub source: String, // "claude" or "local"
}

pub async fn ask(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    body.validate()?;
    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question must be 1-500 characters".into()));
    }

    let period = Period::from_label(body.period.as_deref());
    let now = Utc::now();

    let entries = sqlx::query_as::<_, Entry>(
        r#"
        SELECT * FROM entries
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(period.window_start(now))
    .fetch_all(&state.db)
    .await?;

    if entries.is_empty() {
        return Ok(Json(AskResponse {
            answer: NO_ENTRIES_ANSWER.to_string(),
            referenced_entries: Vec::new(),
            source: "local".into(),
        }));
    }

    let prompt_entries = prompt_entries(&entries, &state.aggregator);
    let titles: HashMap<Uuid, String> = entries
        .iter()
        .map(|e| (e.id, e.title.clone()))
        .collect();

    let reply = state
        .llm
        .answer_question(question, state.aggregator.date_key(now), &prompt_entries)
        .await?;
    let rendered = render_entry_links(&reply, &titles);

    tracing::info!(
        user_id = %auth_user.id,
        period = period.label(),
        entries = entries.len(),
        referenced = rendered.referenced.len(),
        "Journal question answered"
    );

    Ok(Json(AskResponse {
        answer: rendered.text,
        referenced_entries: rendered.referenced,
        source: "claude".into(),
    }))
}

fn prompt_entries(entries: &[Entry], aggregator: &MoodAggregator) -> Vec<PromptEntry> {
    entries
        .iter()
        .map(|e| PromptEntry {
            id: e.id,
            date: aggregator.date_key(e.created_at),
            title: e.title.clone(),
            mood: e.mood.clone(),
            score: e.mood_score,
            text: truncate_chars(&html_to_text(&e.content), ENTRY_TEXT_LIMIT),
        })
        .collect()
}

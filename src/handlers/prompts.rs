use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DailyPromptResponse {
    pub prompt: String,
}

/// Writing prompt shown above the editor. Never fails: upstream errors
/// degrade to the fallback prompt.
pub async fn daily_prompt(State(state): State<AppState>) -> Json<DailyPromptResponse> {
    Json(DailyPromptResponse {
        prompt: state.advice.daily_prompt().await,
    })
}

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "moodjournal-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once the database answers. Missing API keys are reported but do not
/// fail readiness: entries are then saved without mood or image.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ready" } else { "not_ready" },
            "checks": {
                "database": if db_ok { "ok" } else { "failed" },
                "mood_analysis": if state.llm.is_configured() { "configured" } else { "disabled" },
                "image_search": if state.config.pixabay_api_key.is_empty() { "disabled" } else { "configured" },
            },
        })),
    )
}

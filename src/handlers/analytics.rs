use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::entry::{Entry, EntryView};
use crate::services::analytics::{OverallStats, Period, TimelinePoint};
use crate::services::mood::{classify, MoodCategory};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub period: &'static str,
    pub timeline: Vec<TimelinePoint>,
    pub stats: OverallStats,
    pub trend: MoodCategory,
    pub entries: Vec<EntryView>,
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsResponse>> {
    let period = Period::from_label(params.period.as_deref());
    let since = period.window_start(Utc::now());

    let entries = sqlx::query_as::<_, Entry>(
        r#"
        SELECT * FROM entries
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let result = state.aggregator.aggregate(&entries, period);
    let trend = classify(result.stats.average_score);

    tracing::debug!(
        user_id = %auth_user.id,
        period = period.label(),
        entries = entries.len(),
        "Analytics computed"
    );

    Ok(Json(AnalyticsResponse {
        period: period.label(),
        timeline: result.timeline,
        stats: result.stats,
        trend,
        entries: entries.into_iter().map(EntryView::from).collect(),
    }))
}

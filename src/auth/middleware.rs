use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::{verify_token, Claims};
use crate::error::AppError;
use crate::AppState;

/// The signed-in writer, resolved to our own `users.id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    #[allow(dead_code)]
    pub email: Option<String>,
}

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = bearer_token(header).ok_or(AppError::Unauthorized)?;

    let claims = verify_token(token, &state.config)?.claims;
    let id = resolve_user(&state, &claims).await?;

    req.extensions_mut().insert(AuthUser {
        id,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

/// Look up the local user for a provider id, creating the row on first sight.
async fn resolve_user(state: &AppState, claims: &Claims) -> Result<Uuid, AppError> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE external_id = $1")
        .bind(&claims.sub)
        .fetch_optional(&state.db)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    // Two first requests can race here; the upsert keeps one row.
    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (id, external_id, email, name, image_url)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (external_id) DO UPDATE SET updated_at = NOW()
           RETURNING id"#,
    )
    .bind(Uuid::new_v4())
    .bind(&claims.sub)
    .bind(&claims.email)
    .bind(&claims.name)
    .bind(&claims.image_url)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %id, external_id = %claims.sub, "User provisioned");
    Ok(id)
}

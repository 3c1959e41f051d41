use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Session token claims as issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Provider-side user id.
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "picture", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    if let Some(issuer) = config.auth_jwt_issuer.as_deref() {
        validation.set_issuer(&[issuer]);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth_jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        AppError::Unauthorized
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(data)
}

#[cfg(test)]
pub(crate) fn issue_test_token(sub: &str, ttl_secs: i64, issuer: Option<&str>, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        exp: now + ttl_secs,
        iat: Some(now),
        iss: issuer.map(str::to_string),
        email: Some("writer@example.com".into()),
        name: Some("Writer".into()),
        image_url: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_valid_token_is_accepted() {
        let config = test_config();
        let token = issue_test_token("user_123", 600, None, &config.auth_jwt_secret);
        let data = verify_token(&token, &config).unwrap();
        assert_eq!(data.claims.sub, "user_123");
        assert_eq!(data.claims.email.as_deref(), Some("writer@example.com"));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = test_config();
        // Beyond the default 60s leeway.
        let token = issue_test_token("user_123", -3600, None, &config.auth_jwt_secret);
        assert!(matches!(verify_token(&token, &config), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = test_config();
        let token = issue_test_token("user_123", 600, None, "another-secret");
        assert!(matches!(verify_token(&token, &config), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let mut config = test_config();
        config.auth_jwt_issuer = Some("https://id.example.com".into());

        let good = issue_test_token("u", 600, Some("https://id.example.com"), &config.auth_jwt_secret);
        assert!(verify_token(&good, &config).is_ok());

        let bad = issue_test_token("u", 600, Some("https://evil.example.com"), &config.auth_jwt_secret);
        assert!(verify_token(&bad, &config).is_err());
    }

    #[test]
    fn test_empty_subject_is_rejected() {
        let config = test_config();
        let token = issue_test_token("  ", 600, None, &config.auth_jwt_secret);
        assert!(verify_token(&token, &config).is_err());
    }
}

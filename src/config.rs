use std::env;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    // Tokens are issued by the identity provider; we only verify them.
    pub auth_jwt_secret: String,
    pub auth_jwt_issuer: Option<String>,

    pub claude_api_key: String,
    pub claude_model: String,
    pub claude_api_url: String,

    pub pixabay_api_key: String,
    pub pixabay_api_url: String,

    pub advice_api_url: String,
    pub daily_prompt_ttl_secs: u64,

    /// Offset used to truncate `created_at` into a calendar day for analytics.
    pub analytics_utc_offset_minutes: i32,

    // Per-user limits on endpoints that call the language model
    pub entry_rate_limit: u32,
    pub entry_rate_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            auth_jwt_secret: env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET must be set"),
            auth_jwt_issuer: env::var("AUTH_JWT_ISSUER").ok().filter(|s| !s.is_empty()),

            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_else(|_| String::new()),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),
            claude_api_url: env::var("CLAUDE_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into()),

            pixabay_api_key: env::var("PIXABAY_API_KEY").unwrap_or_else(|_| String::new()),
            pixabay_api_url: env::var("PIXABAY_API_URL")
                .unwrap_or_else(|_| "https://pixabay.com/api/".into()),

            advice_api_url: env::var("ADVICE_API_URL")
                .unwrap_or_else(|_| "https://api.adviceslip.com/advice".into()),
            daily_prompt_ttl_secs: env::var("DAILY_PROMPT_TTL_SECS")
                .unwrap_or_else(|_| "86400".into()) // 24 hours
                .parse()
                .unwrap_or(86400),

            analytics_utc_offset_minutes: env::var("ANALYTICS_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .expect("ANALYTICS_UTC_OFFSET_MINUTES must be a number"),

            entry_rate_limit: env::var("ENTRY_RATE_LIMIT")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            entry_rate_window_secs: env::var("ENTRY_RATE_WINDOW_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .unwrap_or(3600),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Offset applied to every date-bucketing operation. Out-of-range values
    /// fall back to UTC.
    pub fn analytics_offset(&self) -> FixedOffset {
        self.analytics_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/moodjournal_test".into(),
        db_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        auth_jwt_secret: "test-secret".into(),
        auth_jwt_issuer: None,
        claude_api_key: String::new(),
        claude_model: "test-model".into(),
        claude_api_url: "http://127.0.0.1:9/v1/messages".into(),
        pixabay_api_key: String::new(),
        pixabay_api_url: "http://127.0.0.1:9/api/".into(),
        advice_api_url: "http://127.0.0.1:9/advice".into(),
        daily_prompt_ttl_secs: 86400,
        analytics_utc_offset_minutes: 0,
        entry_rate_limit: 10,
        entry_rate_window_secs: 3600,
    }
}

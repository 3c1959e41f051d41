use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::Config;

pub const FALLBACK_PROMPT: &str = "What's on your mind today?";

#[derive(Debug, Clone)]
pub struct CachedPrompt {
    pub value: String,
    pub last_fetched_at: Instant,
}

impl CachedPrompt {
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_fetched_at) < ttl
    }
}

/// Process-wide cache for the writing prompt shown above the editor.
/// Refreshed lazily once the TTL has passed; fallbacks are never stored.
#[derive(Clone)]
pub struct DailyPromptCache {
    entry: Arc<Mutex<Option<CachedPrompt>>>,
    ttl: Duration,
}

impl DailyPromptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(Mutex::new(None)),
            ttl,
        }
    }

    /// Return the cached value if fresh, otherwise run `fetch` and store a
    /// successful result. The lock is held across the fetch so concurrent
    /// callers wait for a single refresh.
    pub async fn get_or_refresh<F, Fut, E>(&self, now: Instant, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, E>>,
    {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(now, self.ttl) {
                return Ok(cached.value.clone());
            }
        }

        let value = fetch().await?;
        *entry = Some(CachedPrompt {
            value: value.clone(),
            last_fetched_at: now,
        });
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    slip: AdviceSlip,
}

#[derive(Debug, Deserialize)]
struct AdviceSlip {
    advice: String,
}

#[derive(Clone)]
pub struct AdviceClient {
    http: reqwest::Client,
    api_url: String,
    cache: DailyPromptCache,
}

impl AdviceClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_url: config.advice_api_url.clone(),
            cache: DailyPromptCache::new(Duration::from_secs(config.daily_prompt_ttl_secs)),
        }
    }

    pub async fn daily_prompt(&self) -> String {
        let result = self
            .cache
            .get_or_refresh(Instant::now(), || self.fetch_advice())
            .await;

        match result {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching daily prompt, using fallback");
                FALLBACK_PROMPT.to_string()
            }
        }
    }

    async fn fetch_advice(&self) -> Result<String, reqwest::Error> {
        let response: AdviceResponse = self
            .http
            .get(&self.api_url)
            .timeout(Duration::from_secs(10))
            .header("cache-control", "no-store")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!("Daily prompt refreshed");
        Ok(response.slip.advice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cache_serves_fresh_value() {
        let cache = DailyPromptCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let t0 = Instant::now();

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>("Be kind to yourself.".to_string())
        };

        assert_eq!(cache.get_or_refresh(t0, fetch).await, Ok("Be kind to yourself.".to_string()));
        let later = t0 + Duration::from_secs(59);
        assert_eq!(
            cache
                .get_or_refresh(later, || async { Ok::<_, ()>("other".to_string()) })
                .await,
            Ok("Be kind to yourself.".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_after_ttl() {
        let cache = DailyPromptCache::new(Duration::from_secs(60));
        let t0 = Instant::now();

        cache
            .get_or_refresh(t0, || async { Ok::<_, ()>("first".to_string()) })
            .await
            .unwrap();
        let value = cache
            .get_or_refresh(t0 + Duration::from_secs(60), || async {
                Ok::<_, ()>("second".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "second");
    }

    #[tokio::test]
    async fn test_failed_refresh_is_not_cached() {
        let cache = DailyPromptCache::new(Duration::from_secs(60));
        let t0 = Instant::now();

        let failed = cache
            .get_or_refresh(t0, || async { Err::<String, _>("offline") })
            .await;
        assert_eq!(failed, Err("offline"));

        let value = cache
            .get_or_refresh(t0, || async { Ok::<_, &str>("recovered".to_string()) })
            .await;
        assert_eq!(value, Ok("recovered".to_string()));
    }

    #[test]
    fn test_cached_prompt_freshness() {
        let t0 = Instant::now();
        let cached = CachedPrompt {
            value: "x".into(),
            last_fetched_at: t0,
        };
        let ttl = Duration::from_secs(10);
        assert!(cached.is_fresh(t0, ttl));
        assert!(cached.is_fresh(t0 + Duration::from_secs(9), ttl));
        assert!(!cached.is_fresh(t0 + Duration::from_secs(10), ttl));
    }

    #[tokio::test]
    async fn test_unreachable_api_returns_fallback() {
        let client = AdviceClient::new(reqwest::Client::new(), &crate::config::test_config());
        assert_eq!(client.daily_prompt().await, FALLBACK_PROMPT);
    }

    #[test]
    fn test_parse_advice_response() {
        let parsed: AdviceResponse =
            serde_json::from_str(r#"{"slip": {"id": 42, "advice": "Drink water."}}"#).unwrap();
        assert_eq!(parsed.slip.advice, "Drink water.");
    }
}

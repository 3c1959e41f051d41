use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
}

/// Illustration lookup for an entry's mood. Every failure degrades to `None`;
/// an entry without a picture is still a valid entry.
#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl ImageClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_key: config.pixabay_api_key.clone(),
            api_url: config.pixabay_api_url.clone(),
        }
    }

    pub async fn find_image(&self, query: &str) -> Option<String> {
        if self.api_key.is_empty() || query.trim().is_empty() {
            return None;
        }

        let url = match self.search(query).await {
            Ok(url) => url?,
            Err(e) => {
                tracing::warn!(error = %e, query = %query, "Image search failed");
                return None;
            }
        };

        // Search results occasionally point at images that are gone.
        match self
            .http
            .head(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(res) if res.status().is_success() => Some(url),
            Ok(res) => {
                tracing::warn!(url = %url, status = res.status().as_u16(), "Invalid image URL");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Error validating image URL");
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Option<String>, reqwest::Error> {
        // Queries arrive `+`-joined; let the encoder produce the separators.
        let terms = query.replace('+', " ");
        let response: SearchResponse = self
            .http
            .get(&self.api_url)
            .timeout(Duration::from_secs(10))
            .query(&search_params(&self.api_key, &terms))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(first_image_url(response))
    }
}

fn search_params<'a>(api_key: &'a str, query: &'a str) -> [(&'static str, &'a str); 6] {
    [
        ("key", api_key),
        ("q", query),
        ("min_width", "1280"),
        ("min_height", "720"),
        ("image_type", "illustration"),
        ("category", "feelings"),
    ]
}

fn first_image_url(response: SearchResponse) -> Option<String> {
    response
        .hits
        .into_iter()
        .next()
        .and_then(|hit| hit.large_image_url)
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_image_url() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"total": 2, "hits": [
                {"largeImageURL": "https://cdn.example/a.png"},
                {"largeImageURL": "https://cdn.example/b.png"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            first_image_url(response),
            Some("https://cdn.example/a.png".to_string())
        );
    }

    #[test]
    fn test_first_image_url_without_hits() {
        let response: SearchResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert_eq!(first_image_url(response), None);

        let response: SearchResponse =
            serde_json::from_str(r#"{"hits": [{"largeImageURL": ""}]}"#).unwrap();
        assert_eq!(first_image_url(response), None);
    }

    #[test]
    fn test_search_params() {
        let params = search_params("k", "happy+sun");
        assert!(params.contains(&("q", "happy+sun")));
        assert!(params.contains(&("category", "feelings")));
    }

    #[tokio::test]
    async fn test_missing_key_skips_lookup() {
        let client = ImageClient::new(reqwest::Client::new(), &crate::config::test_config());
        assert_eq!(client.find_image("happy").await, None);
    }
}

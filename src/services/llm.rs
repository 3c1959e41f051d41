use std::time::Duration;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

static JSON_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model API key is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response had no text content")]
    MissingContent,

    #[error("could not parse model reply: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model reply: {0}")]
    InvalidReply(String),
}

/// Mood inferred from an entry's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodAnalysis {
    pub mood: String,
    pub emoji: String,
    pub sentiment_score: f64,
    pub image_query: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoodReply {
    mood: String,
    #[serde(default)]
    emoji: String,
    sentiment_score: f64,
    #[serde(alias = "pixabayQuery", default)]
    image_query: String,
    #[serde(default)]
    color: String,
}

/// One entry as handed to the model for question answering.
#[derive(Debug, Clone, Serialize)]
pub struct PromptEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub mood: Option<String>,
    pub score: Option<f64>,
    pub text: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_key: config.claude_api_key.clone(),
            model: config.claude_model.clone(),
            api_url: config.claude_api_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn analyze_mood(&self, content: &str) -> Result<MoodAnalysis, LlmError> {
        let reply = self.complete(&mood_prompt(content), 512).await?;
        parse_mood_analysis(&reply)
    }

    pub async fn answer_question(
        &self,
        question: &str,
        today: NaiveDate,
        entries: &[PromptEntry],
    ) -> Result<String, LlmError> {
        let prompt = question_prompt(question, today, entries)?;
        let reply = self.complete(&prompt, 1024).await?;
        Ok(reply.trim().to_string())
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let response = self
            .http
            .post(&self.api_url)
            .timeout(Duration::from_secs(30))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "temperature": 0,
                "messages": [{
                    "role": "user",
                    "content": prompt
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body: serde_json::Value = response.json().await?;
        body["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(LlmError::MissingContent)
    }
}

pub fn mood_prompt(content: &str) -> String {
    format!(
        r#"Analyze the following journal entry. The entry may contain HTML tags or rich text formatting; ignore the markup and focus only on the text.

Respond with a single JSON object and nothing else, using this exact schema:
{{
  "mood": "a short mood label for the overall emotion, like \"Happy\", \"Sad\", \"Anxious\"",
  "emoji": "a single emoji that represents the mood",
  "sentimentScore": "a number from 0 to 10; 0 is extremely negative, 5 neutral, 10 extremely positive",
  "imageQuery": "keywords joined with + suitable for an illustration search, e.g. happy+smile+sunshine",
  "color": "a HEX color code representing the mood, e.g. #facc15"
}}

Journal entry:
{}"#,
        content
    )
}

/// Pull the JSON object out of a reply that may be fenced or surrounded by prose.
pub fn extract_json(reply: &str) -> Option<&str> {
    if let Some(caps) = JSON_FENCE_PATTERN.captures(reply) {
        if let Some(inner) = caps.get(1) {
            return Some(inner.as_str());
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

pub fn parse_mood_analysis(reply: &str) -> Result<MoodAnalysis, LlmError> {
    let json = extract_json(reply)
        .ok_or_else(|| LlmError::InvalidReply("no JSON object in reply".into()))?;
    let parsed: MoodReply = serde_json::from_str(json)?;

    let mood = parsed.mood.trim().to_string();
    if mood.is_empty() {
        return Err(LlmError::InvalidReply("empty mood label".into()));
    }
    if !parsed.sentiment_score.is_finite() {
        return Err(LlmError::InvalidReply("sentiment score is not a number".into()));
    }

    Ok(MoodAnalysis {
        image_query: if parsed.image_query.trim().is_empty() {
            mood.to_lowercase()
        } else {
            parsed.image_query.trim().to_string()
        },
        mood,
        emoji: parsed.emoji.trim().to_string(),
        sentiment_score: parsed.sentiment_score.clamp(0.0, 10.0),
        color: parsed.color.trim().to_string(),
    })
}

pub fn question_prompt(
    question: &str,
    today: NaiveDate,
    entries: &[PromptEntry],
) -> Result<String, LlmError> {
    let serialized = serde_json::to_string_pretty(entries)?;
    Ok(format!(
        r#"You are a thoughtful journaling assistant. Answer the user's question using only the journal entries below.

Rules:
- When you refer to a specific entry, cite it inline as [entry:<id>] using the entry's "id" value exactly.
- Do not invent entries or ids.
- Mood scores range from 0 (very negative) to 10 (very positive).
- If the entries do not answer the question, say so briefly.
- Keep the answer short, warm and in plain text.

Today's date: {}

Journal entries (JSON):
{}

Question: {}"#,
        today, serialized, question
    ))
}

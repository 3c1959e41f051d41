use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::analytics::MoodSample;
use crate::services::llm::MoodAnalysis;
use crate::services::mood::{classify, display_label, MoodCategory, MoodColorClasses};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub mood_score: Option<f64>,
    pub mood_query: Option<String>,
    pub mood_image_url: Option<String>,
    pub mood_color: Option<String>,
    pub mood_emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MoodSample for Entry {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn mood_score(&self) -> Option<f64> {
        self.mood_score
    }

    fn mood_label(&self) -> Option<&str> {
        self.mood.as_deref()
    }
}

/// Row shape for listings that join the collection name.
#[derive(Debug, Clone, FromRow)]
pub struct EntryWithCollection {
    #[sqlx(flatten)]
    pub entry: Entry,
    pub collection_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MoodDisplay {
    pub label: String,
    pub score: f64,
    pub category: MoodCategory,
    pub classes: MoodColorClasses,
}

impl MoodDisplay {
    pub fn for_entry(entry: &Entry) -> Option<Self> {
        let score = entry.mood_score?;
        let category = classify(score);
        Some(Self {
            label: entry
                .mood
                .as_deref()
                .map(display_label)
                .unwrap_or_default(),
            score,
            classes: category.color_tag.classes(),
            category,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    pub collection: Option<CollectionRef>,
    pub mood_display: Option<MoodDisplay>,
}

impl EntryView {
    pub fn new(entry: Entry, collection_name: Option<String>) -> Self {
        let collection = entry
            .collection_id
            .zip(collection_name)
            .map(|(id, name)| CollectionRef { id, name });
        let mood_display = MoodDisplay::for_entry(&entry);
        Self {
            entry,
            collection,
            mood_display,
        }
    }
}

impl From<Entry> for EntryView {
    fn from(entry: Entry) -> Self {
        Self::new(entry, None)
    }
}

impl From<EntryWithCollection> for EntryView {
    fn from(row: EntryWithCollection) -> Self {
        Self::new(row.entry, row.collection_name)
    }
}

/// The mood columns written together on create/update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodFields {
    pub mood: Option<String>,
    pub mood_score: Option<f64>,
    pub mood_query: Option<String>,
    pub mood_color: Option<String>,
    pub mood_emoji: Option<String>,
}

impl MoodFields {
    pub fn from_analysis(analysis: MoodAnalysis) -> Self {
        Self {
            mood: Some(analysis.mood),
            mood_score: Some(analysis.sentiment_score),
            mood_query: Some(analysis.image_query),
            mood_color: Some(analysis.color).filter(|c| !c.is_empty()),
            mood_emoji: Some(analysis.emoji).filter(|e| !e.is_empty()),
        }
    }

    /// Mood supplied by the client (already analysed on its side). Emoji
    /// comes from the score tier.
    pub fn from_manual(mood: &str, score: f64, query: Option<&str>) -> Self {
        let mood = mood.trim().to_string();
        Self {
            mood_query: Some(
                query
                    .map(str::to_string)
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| mood.to_lowercase()),
            ),
            mood: Some(mood),
            mood_score: Some(score),
            mood_color: None,
            mood_emoji: Some(classify(score).emoji.to_string()),
        }
    }

    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            mood: entry.mood.clone(),
            mood_score: entry.mood_score,
            mood_query: entry.mood_query.clone(),
            mood_color: entry.mood_color.clone(),
            mood_emoji: entry.mood_emoji.clone(),
        }
    }
}

/// Rejects strings that are empty once surrounding whitespace is trimmed.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEntryRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"), custom = "not_blank")]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"), custom = "not_blank")]
    pub content: String,
    #[validate(length(min = 1, max = 50))]
    pub mood: Option<String>,
    #[validate(range(min = 0.0, max = 10.0, message = "Mood score must be between 0 and 10"))]
    pub mood_score: Option<f64>,
    pub mood_query: Option<String>,
    pub collection_id: Option<Uuid>,
}

impl CreateEntryRequest {
    pub fn manual_mood(&self) -> Option<MoodFields> {
        match (&self.mood, self.mood_score) {
            (Some(mood), Some(score)) => {
                Some(MoodFields::from_manual(mood, score, self.mood_query.as_deref()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEntryRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"), custom = "not_blank")]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"), custom = "not_blank")]
    pub content: String,
    #[validate(length(min = 1, max = 50))]
    pub mood: Option<String>,
    #[validate(range(min = 0.0, max = 10.0, message = "Mood score must be between 0 and 10"))]
    pub mood_score: Option<f64>,
    pub mood_query: Option<String>,
    pub collection_id: Option<Uuid>,
}

impl UpdateEntryRequest {
    pub fn manual_mood(&self) -> Option<MoodFields> {
        match (&self.mood, self.mood_score) {
            (Some(mood), Some(score)) => {
                Some(MoodFields::from_manual(mood, score, self.mood_query.as_deref()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeEntryRequest {
    #[validate(length(min = 1, max = 20000, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeEntryResponse {
    pub analysis: MoodAnalysis,
    pub category: MoodCategory,
}

#[derive(Debug, Deserialize, Default)]
pub struct EntryQuery {
    /// A collection id, or `unorganized` for entries outside any collection.
    pub collection_id: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub mood: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFilter {
    Any,
    Unorganized,
    Collection(Uuid),
}

impl CollectionFilter {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Any),
            Some("unorganized") => Ok(Self::Unorganized),
            Some(id) => Uuid::parse_str(id)
                .map(Self::Collection)
                .map_err(|_| AppError::Validation("Invalid collection id".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// UTC range `[start, end)` covering one calendar day at `offset`.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| AppError::Validation("Invalid date".into()))?
        .with_timezone(&Utc);
    Ok((start, start + chrono::Duration::days(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(score: Option<f64>, mood: Option<&str>) -> Entry {
        let now = Utc::now();
        Entry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            collection_id: None,
            title: "Title".into(),
            content: "<p>Body</p>".into(),
            mood: mood.map(str::to_string),
            mood_score: score,
            mood_query: None,
            mood_image_url: None,
            mood_color: None,
            mood_emoji: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_collection_filter_parse() {
        assert_eq!(CollectionFilter::parse(None).unwrap(), CollectionFilter::Any);
        assert_eq!(CollectionFilter::parse(Some("")).unwrap(), CollectionFilter::Any);
        assert_eq!(
            CollectionFilter::parse(Some("unorganized")).unwrap(),
            CollectionFilter::Unorganized
        );
        let id = Uuid::new_v4();
        assert_eq!(
            CollectionFilter::parse(Some(&id.to_string())).unwrap(),
            CollectionFilter::Collection(id)
        );
        assert!(matches!(
            CollectionFilter::parse(Some("nope")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse(None), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("walk"), "%walk%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }

    #[test]
    fn test_day_bounds_respects_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let (start, end) = day_bounds(date, FixedOffset::east_opt(2 * 3600).unwrap()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 2, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_mood_display_requires_score() {
        assert!(MoodDisplay::for_entry(&entry(None, Some("happy"))).is_none());

        let display = MoodDisplay::for_entry(&entry(Some(8.0), Some("happy"))).unwrap();
        assert_eq!(display.label, "Happy");
        assert_eq!(display.category.emoji, "😊");
        assert_eq!(display.classes.bg, "bg-green-50");
    }

    #[test]
    fn test_entry_view_links_collection() {
        let mut e = entry(Some(5.0), Some("calm"));
        let collection_id = Uuid::new_v4();
        e.collection_id = Some(collection_id);

        let view = EntryView::new(e, Some("Travel".into()));
        let collection = view.collection.unwrap();
        assert_eq!(collection.id, collection_id);
        assert_eq!(collection.name, "Travel");

        let json = serde_json::to_value(EntryView::from(entry(None, None))).unwrap();
        assert!(json["collection"].is_null());
        assert!(json["mood_display"].is_null());
        assert_eq!(json["title"], "Title");
    }

    #[test]
    fn test_manual_mood_fields() {
        let fields = MoodFields::from_manual(" Anxious ", 3.0, None);
        assert_eq!(fields.mood.as_deref(), Some("Anxious"));
        assert_eq!(fields.mood_query.as_deref(), Some("anxious"));
        assert_eq!(fields.mood_emoji.as_deref(), Some("😔"));
    }

    #[test]
    fn test_analysis_mood_fields_drop_empty_strings() {
        let fields = MoodFields::from_analysis(MoodAnalysis {
            mood: "Happy".into(),
            emoji: String::new(),
            sentiment_score: 9.0,
            image_query: "happy+sun".into(),
            color: "#facc15".into(),
        });
        assert_eq!(fields.mood_emoji, None);
        assert_eq!(fields.mood_color.as_deref(), Some("#facc15"));
        assert_eq!(fields.mood_score, Some(9.0));
    }

    #[test]
    fn test_blank_title_and_content_are_rejected() {
        let blank = CreateEntryRequest {
            title: "   ".into(),
            content: "  \n ".into(),
            mood: None,
            mood_score: None,
            mood_query: None,
            collection_id: None,
        };
        let errors = blank.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("content"));

        let update = UpdateEntryRequest {
            title: "\t".into(),
            content: "<p>Still here</p>".into(),
            mood: None,
            mood_score: None,
            mood_query: None,
            collection_id: None,
        };
        let errors = update.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(!errors.field_errors().contains_key("content"));
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateEntryRequest {
            title: "Day one".into(),
            content: "<p>Hi</p>".into(),
            mood: None,
            mood_score: None,
            mood_query: None,
            collection_id: None,
        };
        assert!(ok.validate().is_ok());
        assert!(ok.manual_mood().is_none());

        let bad = CreateEntryRequest {
            title: String::new(),
            content: "x".into(),
            mood: Some("happy".into()),
            mood_score: Some(11.0),
            mood_query: None,
            collection_id: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("mood_score"));
    }
}

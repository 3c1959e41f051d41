use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::entry::EntryView;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CollectionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub collection: Collection,
    pub entry_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CollectionListResponse {
    pub collections: Vec<CollectionSummary>,
    /// Entries not filed under any collection.
    pub unorganized_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CollectionWithEntries {
    #[serde(flatten)]
    pub collection: Collection,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollectionRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

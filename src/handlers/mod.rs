pub mod analytics;
pub mod collections;
pub mod drafts;
pub mod entries;
pub mod health;
pub mod insights;
pub mod prompts;
pub mod users;

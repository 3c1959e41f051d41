pub mod analytics;
pub mod daily_prompt;
pub mod entry_links;
pub mod images;
pub mod llm;
pub mod mood;

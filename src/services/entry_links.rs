//! Plain-text extraction for rich-text entries and rendering of
//! `[entry:<uuid>]` citations returned by the language model.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static BLOCK_BREAK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6])\s*/?\s*>").expect("valid regex")
});

static ENTRY_REF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[entry:\s*([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\s*\]")
        .expect("valid regex")
});

/// Strip markup from editor output, keeping line structure and decoding the
/// handful of entities editors emit.
pub fn html_to_text(html: &str) -> String {
    let with_breaks = BLOCK_BREAK_PATTERN.replace_all(html, "\n");
    let stripped = TAG_PATTERN.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAnswer {
    pub text: String,
    /// Known entries cited, in order of first citation.
    pub referenced: Vec<Uuid>,
}

/// Replace citations of known entries with markdown links to the entry page.
/// Citations of ids that were not part of the prompt are removed.
pub fn render_entry_links(answer: &str, titles: &HashMap<Uuid, String>) -> RenderedAnswer {
    let mut referenced = Vec::new();

    let text = ENTRY_REF_PATTERN.replace_all(answer, |caps: &regex::Captures| {
        let Ok(id) = Uuid::parse_str(&caps[1]) else {
            return String::new();
        };
        match titles.get(&id) {
            Some(title) => {
                if !referenced.contains(&id) {
                    referenced.push(id);
                }
                format!("[{}](/journal/{})", escape_link_text(title), id)
            }
            None => {
                tracing::debug!(entry_id = %id, "Dropping citation of unknown entry");
                String::new()
            }
        }
    });

    RenderedAnswer {
        text: text.into_owned(),
        referenced,
    }
}

fn escape_link_text(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return "entry".into();
    }
    trimmed.replace('[', "\\[").replace(']', "\\]")
}

//! Core data models shared by retrieval and history.
//!
//! Retrieval types ([`Document`], [`ContextItem`], [`ContextResult`]) are
//! produced fresh per query and never persisted. History types
//! ([`Conversation`] and friends) mirror the day-log JSON on disk, so their
//! field order and names are part of the storage format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Which part of the corpus a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Article,
    GithubProject,
    CodeFile,
}

/// A candidate document produced by the scanner, holding its full body.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub source_label: String,
    pub category: DocumentCategory,
    pub origin_path: PathBuf,
}

impl Document {
    /// The first `max_chars` characters of the body.
    pub fn preview(&self, max_chars: usize) -> &str {
        truncate_chars(&self.content, max_chars)
    }

    /// Body length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Convert into a context item whose content is cut to `max_chars`.
    pub fn into_context_item(self, max_chars: usize) -> ContextItem {
        let content = self.preview(max_chars).to_string();
        ContextItem {
            content,
            source: self.source_label,
            category: self.category,
            path: self.origin_path.to_string_lossy().to_string(),
        }
    }
}

/// A document as handed to the generation step: truncated body plus
/// attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub content: String,
    pub source: String,
    #[serde(rename = "type")]
    pub category: DocumentCategory,
    pub path: String,
}

/// The context payload for one query.
///
/// `sources` lists every included item's source label once, in the order
/// the items were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub articles: Vec<ContextItem>,
    pub github_projects: Vec<ContextItem>,
    pub sources: Vec<String>,
}

impl ContextResult {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty() && self.github_projects.is_empty()
    }
}

/// One persisted question/answer exchange.
///
/// Every field defaults on read so that hand-edited or older day logs with
/// missing keys still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub id: String,
}

/// A conversation tagged with the day log it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatedConversation {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub date: String,
}

/// Aggregate statistics over every day log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub total_days: usize,
    pub first_conversation: Option<String>,
    pub last_conversation: Option<String>,
    pub conversations_by_date: BTreeMap<String, usize>,
}

/// Cut `text` to at most `max_chars` characters, respecting UTF-8 boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

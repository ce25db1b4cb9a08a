//! Relevance gate between the scanner and the aggregator.
//!
//! [`RelevanceScorer`] is the seam where a ranked or semantic scorer can be
//! swapped in; [`ContextAggregator`](crate::retrieve::ContextAggregator)
//! only looks at [`Relevance::relevant`] and keeps scan order.
//!
//! The built-in [`KeywordOverlapScorer`] counts how many query keywords
//! occur in the document:
//!
//! - the query is lower-cased and split on whitespace;
//! - tokens shorter than `min_keyword_chars` characters are dropped;
//! - a document passes if at least one keyword is a substring of its
//!   lower-cased body, or if the body is strictly shorter than
//!   `short_document_chars` characters.

use crate::config::RetrievalConfig;

/// Outcome of scoring one document against one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relevance {
    /// Number of distinct query keywords found in the document.
    pub hits: usize,
    /// Whether the document belongs in the context payload.
    pub relevant: bool,
}

/// Scores a document body against a free-text query.
///
/// Implementations must be pure with respect to their inputs: retrieval
/// calls may run concurrently and share one scorer.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, content: &str, query: &str) -> Relevance;

    fn is_relevant(&self, content: &str, query: &str) -> bool {
        self.score(content, query).relevant
    }
}

/// Boolean keyword-overlap gate with a short-document bypass.
#[derive(Debug, Clone)]
pub struct KeywordOverlapScorer {
    short_document_chars: usize,
    min_keyword_chars: usize,
}

impl KeywordOverlapScorer {
    pub fn new(short_document_chars: usize, min_keyword_chars: usize) -> Self {
        Self {
            short_document_chars,
            min_keyword_chars,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.short_document_chars, config.min_keyword_chars)
    }

    /// Lower-cased query tokens long enough to count as keywords.
    pub fn keywords(&self, query: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        for token in query.to_lowercase().split_whitespace() {
            if token.chars().count() < self.min_keyword_chars {
                continue;
            }
            if !keywords.iter().any(|k| k == token) {
                keywords.push(token.to_string());
            }
        }
        keywords
    }
}

impl Default for KeywordOverlapScorer {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl RelevanceScorer for KeywordOverlapScorer {
    fn score(&self, content: &str, query: &str) -> Relevance {
        let content_lower = content.to_lowercase();
        let hits = self
            .keywords(query)
            .iter()
            .filter(|k| content_lower.contains(k.as_str()))
            .count();

        let short = content.chars().count() < self.short_document_chars;
        Relevance {
            hits,
            relevant: hits > 0 || short,
        }
    }
}

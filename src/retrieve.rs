//! Context retrieval: scan, gate, truncate, cap.
//!
//! [`ContextAggregator::retrieve_context`] builds the context payload for a
//! query from a fresh corpus scan:
//!
//! 1. articles that pass the relevance gate, truncated to
//!    `article_preview_chars`, first `max_articles` kept;
//! 2. project readmes and code files that pass the gate, in scan order.
//!    Readmes are truncated like articles, code files to
//!    `code_preview_chars`. Each project contributes at most
//!    `max_code_files` code files, and at most `max_project_items` items are
//!    kept across all projects;
//! 3. `sources` is every kept item's label, first occurrence wins.
//!
//! Retrieval never fails: a category whose scan fails contributes nothing,
//! and the caller answers with whatever context is left (possibly none).

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::{Config, RetrievalConfig};
use crate::models::{ContextItem, ContextResult, DocumentCategory};
use crate::relevance::{KeywordOverlapScorer, RelevanceScorer};
use crate::scanner::DocumentScanner;

pub struct ContextAggregator {
    scanner: DocumentScanner,
    scorer: Arc<dyn RelevanceScorer>,
    limits: RetrievalConfig,
}

impl ContextAggregator {
    pub fn new(
        scanner: DocumentScanner,
        scorer: Arc<dyn RelevanceScorer>,
        limits: RetrievalConfig,
    ) -> Self {
        Self {
            scanner,
            scorer,
            limits,
        }
    }

    /// Aggregator over the configured corpus with the keyword-overlap gate.
    ///
    /// Creates the corpus roots if they are missing; failing to create them
    /// is logged and leaves an empty corpus.
    pub fn from_config(config: &Config) -> Result<Self> {
        let scanner = DocumentScanner::from_config(config)?;
        if let Err(e) = scanner.ensure_roots() {
            error!("{:#}", e);
        }
        let scorer = Arc::new(KeywordOverlapScorer::from_config(&config.retrieval));
        Ok(Self::new(scanner, scorer, config.retrieval.clone()))
    }

    pub fn retrieve_context(&self, query: &str) -> ContextResult {
        let articles = self.search_articles(query).unwrap_or_else(|e| {
            error!("error searching articles: {:#}", e);
            Vec::new()
        });
        let github_projects = self.search_projects(query).unwrap_or_else(|e| {
            error!("error searching projects: {:#}", e);
            Vec::new()
        });

        let sources = collect_sources(articles.iter().chain(github_projects.iter()));
        debug!(
            "retrieved {} articles, {} project items for query {:?}",
            articles.len(),
            github_projects.len(),
            query
        );

        ContextResult {
            articles,
            github_projects,
            sources,
        }
    }

    fn search_articles(&self, query: &str) -> Result<Vec<ContextItem>> {
        let items = self
            .scanner
            .list_articles()?
            .into_iter()
            .filter(|doc| self.scorer.is_relevant(&doc.content, query))
            .take(self.limits.max_articles)
            .map(|doc| doc.into_context_item(self.limits.article_preview_chars))
            .collect();
        Ok(items)
    }

    fn search_projects(&self, query: &str) -> Result<Vec<ContextItem>> {
        let mut items = Vec::new();

        'projects: for (name, dir) in self.scanner.project_dirs()? {
            let mut code_files = 0;
            for doc in self.scanner.list_project(&name, &dir) {
                if items.len() >= self.limits.max_project_items {
                    break 'projects;
                }
                let is_code = doc.category == DocumentCategory::CodeFile;
                if is_code && code_files >= self.limits.max_code_files {
                    continue;
                }
                if !self.scorer.is_relevant(&doc.content, query) {
                    continue;
                }

                let max_chars = if is_code {
                    code_files += 1;
                    self.limits.code_preview_chars
                } else {
                    self.limits.article_preview_chars
                };
                items.push(doc.into_context_item(max_chars));
            }
        }

        Ok(items)
    }

    /// Number of article files, rescanned on every call.
    pub fn count_articles(&self) -> usize {
        self.scanner.count_articles().unwrap_or_else(|e| {
            error!("error counting articles: {:#}", e);
            0
        })
    }

    /// Number of project directories, rescanned on every call.
    pub fn count_projects(&self) -> usize {
        self.scanner.count_projects().unwrap_or_else(|e| {
            error!("error counting projects: {:#}", e);
            0
        })
    }
}

fn collect_sources<'a>(items: impl Iterator<Item = &'a ContextItem>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for item in items {
        if seen.insert(item.source.as_str()) {
            sources.push(item.source.clone());
        }
    }
    sources
}

/// CLI entry point for `rag search`.
pub fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let aggregator = ContextAggregator::from_config(config)?;
    let result = aggregator.retrieve_context(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_section("Articles", &result.articles);
    print_section("GitHub projects", &result.github_projects);

    println!("Sources: {}", result.sources.join(", "));
    Ok(())
}

fn print_section(title: &str, items: &[ContextItem]) {
    if items.is_empty() {
        return;
    }
    println!("--- {} ({}) ---", title, items.len());
    for (i, item) in items.iter().enumerate() {
        let excerpt: String = item.content.chars().take(160).collect();
        println!("{}. {}", i + 1, item.source);
        println!("    path: {}", item.path);
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
    }
    println!();
}

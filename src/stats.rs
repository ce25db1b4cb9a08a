//! Corpus and history overview.
//!
//! Counts are recomputed from the filesystem on every call; nothing is
//! cached between invocations. Used by `rag stats`.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::history::ConversationStore;
use crate::retrieve::ContextAggregator;

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total_articles: usize,
    pub total_projects: usize,
    pub total_conversations: usize,
    pub last_updated: String,
}

pub fn collect_stats(aggregator: &ContextAggregator, store: &ConversationStore) -> CorpusStats {
    CorpusStats {
        total_articles: aggregator.count_articles(),
        total_projects: aggregator.count_projects(),
        total_conversations: store.count_total_conversations(),
        last_updated: chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
    }
}

/// Run the stats command: scan corpus and history, print a summary.
pub fn run_stats(config: &Config, json: bool) -> Result<()> {
    let aggregator = ContextAggregator::from_config(config)?;
    let store = ConversationStore::from_config(config)?;
    let stats = collect_stats(&aggregator, &store);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("RAG Anything — Corpus Stats");
    println!("===========================");
    println!();
    println!("  Articles:       {}", stats.total_articles);
    println!("    root:         {}", config.corpus.articles_dir.display());
    println!("  Projects:       {}", stats.total_projects);
    println!("    root:         {}", config.corpus.projects_dir.display());
    println!("  Conversations:  {}", stats.total_conversations);
    println!("    dir:          {}", config.history.dir.display());
    println!();
    println!("  As of {}", stats.last_updated);
    println!();

    Ok(())
}

//! # RAG Anything
//!
//! Retrieval and history backend for a question-answering assistant.
//!
//! Two halves, both backed by plain files:
//!
//! - **retrieval**: scan a corpus of article files and cloned project
//!   directories, gate each document with a keyword-overlap relevance
//!   check, and shape the survivors into a capped, truncated context
//!   payload with source attribution;
//! - **history**: persist every question/answer exchange into one JSON day
//!   log per calendar date, with lookup by date, a trailing-window read,
//!   aggregate statistics, and deletion.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌───────────────────┐
//! │   Scanner    │──▶│ Relevance  │──▶│ ContextAggregator │──▶ ContextResult
//! │ articles/    │   │   gate     │   │  cap + truncate   │
//! │ projects/    │   └────────────┘   └───────────────────┘
//! └──────────────┘
//!
//!   (question, answer, timestamp, sources) ──▶ ConversationStore
//!                                              chat_<YYYY-MM-DD>.json
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag init                                  # create corpus + history dirs
//! rag search "tokio runtime"                # show the context payload
//! rag history save --question "..." --answer "..." --source notes.md
//! rag history show 2024-01-01
//! rag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scanner`] | Corpus scanner |
//! | [`relevance`] | Relevance scorer trait and keyword-overlap gate |
//! | [`retrieve`] | Context aggregation |
//! | [`history`] | Date-partitioned conversation store |
//! | [`stats`] | Corpus and history counts |

pub mod config;
pub mod history;
pub mod models;
pub mod relevance;
pub mod retrieve;
pub mod scanner;
pub mod stats;

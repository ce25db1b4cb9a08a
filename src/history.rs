//! Date-partitioned conversation history.
//!
//! Each calendar date has one day log, `chat_<YYYY-MM-DD>.json` in the
//! history directory, holding a JSON array of [`Conversation`]s. A save
//! loads the day log, appends, and rewrites the whole file; the rewrite goes
//! through a temporary file renamed into place, so readers see either the
//! old or the new log and never a partial one.
//!
//! Saves and deletes for one date are serialized twice: by an in-process
//! mutex keyed by date, then by an exclusive `fs2` lock on a hidden
//! `.chat_<YYYY-MM-DD>.json.lock` sibling. The file lock covers other store
//! instances and other processes on the same directory. Saves for different
//! dates never contend.
//!
//! # Failure model
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | malformed date passed to a lookup | [`HistoryError::InvalidDate`] |
//! | no day log for a date | empty sequence |
//! | day log that cannot be read or decoded | logged, treated as empty |
//! | save fails (bad timestamp, I/O) | logged, [`ConversationStore::save_chat`] returns `false` |

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{Conversation, ConversationStats, DatedConversation};

const DATE_FORMAT: &str = "%Y-%m-%d";
const ID_FORMAT: &str = "%Y%m%d_%H%M%S";
const DAY_LOG_PREFIX: &str = "chat_";
const DAY_LOG_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid timestamp '{0}': expected ISO-8601")]
    InvalidTimestamp(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub struct ConversationStore {
    dir: PathBuf,
    locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl ConversationStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, HistoryError> {
        Self::open(&config.history.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one exchange into the day log of its timestamp's date.
    ///
    /// Returns `false` (after logging why) if the timestamp cannot be parsed
    /// or the day log cannot be written.
    pub fn save_chat(
        &self,
        question: &str,
        answer: &str,
        timestamp: &str,
        sources: &[String],
    ) -> bool {
        match self.append(question, answer, timestamp, sources) {
            Ok(conversation) => {
                info!(
                    "saved conversation {} to {}",
                    conversation.id,
                    self.dir.display()
                );
                true
            }
            Err(e) => {
                error!("error saving chat: {}", e);
                false
            }
        }
    }

    /// Like [`save_chat`](Self::save_chat) but returns the stored record or
    /// the error.
    pub fn append(
        &self,
        question: &str,
        answer: &str,
        timestamp: &str,
        sources: &[String],
    ) -> Result<Conversation, HistoryError> {
        let at = parse_timestamp(timestamp)?;
        let date = at.date();
        let path = self.day_path(date);

        let lock = self.lock_for(date);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _file_lock = self.lock_file(date)?;

        let mut conversations = match load_day(&path) {
            Ok(conversations) => conversations,
            Err(HistoryError::Json(e)) => {
                warn!(
                    "invalid JSON in {}, starting a new log: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let id = unique_id(&conversations, &at.format(ID_FORMAT).to_string());
        let conversation = Conversation {
            timestamp: timestamp.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            sources: sources.to_vec(),
            id,
        };
        conversations.push(conversation.clone());

        self.write_day(date, &path, &conversations)?;
        Ok(conversation)
    }

    /// Conversations recorded on `date`, oldest first.
    pub fn get_history_by_date(&self, date: &str) -> Result<Vec<Conversation>, HistoryError> {
        let date = parse_date(date)?;
        Ok(self.read_day_lenient(date))
    }

    /// Conversations from the last `days` dates ending today, newest first.
    pub fn get_recent_history(&self, days: u32) -> Vec<DatedConversation> {
        self.get_recent_history_ending(Local::now().date_naive(), days)
    }

    /// Conversations from the `days` dates ending at `end` (inclusive),
    /// each tagged with its date, newest first.
    pub fn get_recent_history_ending(&self, end: NaiveDate, days: u32) -> Vec<DatedConversation> {
        let mut all = Vec::new();
        for offset in 0..days {
            let Some(date) = end.checked_sub_days(Days::new(u64::from(offset))) else {
                break;
            };
            let tag = date.format(DATE_FORMAT).to_string();
            all.extend(
                self.read_day_lenient(date)
                    .into_iter()
                    .map(|conversation| DatedConversation {
                        conversation,
                        date: tag.clone(),
                    }),
            );
        }

        all.sort_by(|a, b| b.conversation.timestamp.cmp(&a.conversation.timestamp));
        all
    }

    /// Total records across every day log. Unreadable logs count as zero.
    pub fn count_total_conversations(&self) -> usize {
        self.get_conversation_stats().total_conversations
    }

    /// One pass over every day log.
    ///
    /// `total_days` counts every day log file found, including ones that
    /// failed to decode; `conversations_by_date` only lists the readable ones.
    pub fn get_conversation_stats(&self) -> ConversationStats {
        let mut stats = ConversationStats::default();

        let logs = match self.day_logs() {
            Ok(logs) => logs,
            Err(e) => {
                error!("error listing {}: {}", self.dir.display(), e);
                return stats;
            }
        };
        stats.total_days = logs.len();

        for (date_key, path) in logs {
            let conversations = match load_day(&path) {
                Ok(conversations) => conversations,
                Err(e) => {
                    warn!("error processing {}: {}", path.display(), e);
                    continue;
                }
            };

            stats.total_conversations += conversations.len();
            stats
                .conversations_by_date
                .insert(date_key, conversations.len());

            for c in conversations.iter().filter(|c| !c.timestamp.is_empty()) {
                if stats
                    .first_conversation
                    .as_ref()
                    .map_or(true, |first| c.timestamp < *first)
                {
                    stats.first_conversation = Some(c.timestamp.clone());
                }
                if stats
                    .last_conversation
                    .as_ref()
                    .map_or(true, |last| c.timestamp > *last)
                {
                    stats.last_conversation = Some(c.timestamp.clone());
                }
            }
        }

        stats
    }

    /// Remove the day log for `date`. Returns `false` if there was none or
    /// it could not be removed.
    pub fn delete_history_by_date(&self, date: &str) -> Result<bool, HistoryError> {
        let date = parse_date(date)?;
        let path = self.day_path(date);

        let lock = self.lock_for(date);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _file_lock = match self.lock_file(date) {
            Ok(file_lock) => file_lock,
            Err(e) => {
                error!("error locking history for {}: {}", date, e);
                return Ok(false);
            }
        };

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted history for {}", date);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("no history found for {}", date);
                Ok(false)
            }
            Err(e) => {
                error!("error deleting history for {}: {}", date, e);
                Ok(false)
            }
        }
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!(
            "{}{}{}",
            DAY_LOG_PREFIX,
            date.format(DATE_FORMAT),
            DAY_LOG_SUFFIX
        ))
    }

    fn lock_for(&self, date: NaiveDate) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(date).or_default().clone()
    }

    /// Block until the exclusive lock for `date` is held.
    /// The lock file is never removed, so every holder locks the same inode.
    fn lock_file(&self, date: NaiveDate) -> Result<DayFileLock, HistoryError> {
        let path = self.dir.join(format!(
            ".{}{}{}.lock",
            DAY_LOG_PREFIX,
            date.format(DATE_FORMAT),
            DAY_LOG_SUFFIX
        ));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.lock_exclusive()?;
        Ok(DayFileLock(file))
    }

    fn read_day_lenient(&self, date: NaiveDate) -> Vec<Conversation> {
        let path = self.day_path(date);
        let mut conversations = load_day(&path).unwrap_or_else(|e| {
            warn!("error reading {}: {}", path.display(), e);
            Vec::new()
        });
        conversations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        conversations
    }

    /// Write `conversations` to a sibling temp file and rename it over `path`.
    /// Caller holds the date lock.
    fn write_day(
        &self,
        date: NaiveDate,
        path: &Path,
        conversations: &[Conversation],
    ) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(conversations)?;
        let tmp = self
            .dir
            .join(format!(".{}{}.tmp", DAY_LOG_PREFIX, date.format(DATE_FORMAT)));
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Day log files as `(date key, path)`, sorted by date.
    fn day_logs(&self) -> Result<Vec<(String, PathBuf)>, HistoryError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut logs = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(key) = name
                .strip_prefix(DAY_LOG_PREFIX)
                .and_then(|rest| rest.strip_suffix(DAY_LOG_SUFFIX))
            else {
                continue;
            };
            if entry.path().is_file() {
                logs.push((key.to_string(), entry.path()));
            }
        }
        logs.sort();
        Ok(logs)
    }
}

/// Held for the load, append and write of one day log. Unlocks on drop.
struct DayFileLock(File);

impl Drop for DayFileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Missing file is an empty log; unreadable or undecodable is an error.
fn load_day(path: &Path) -> Result<Vec<Conversation>, HistoryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

/// `base`, or `base_2`, `base_3`, … if already taken in this day log.
fn unique_id(existing: &[Conversation], base: &str) -> String {
    let taken = |id: &str| existing.iter().any(|c| c.id == id);
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Strict `YYYY-MM-DD` (zero-padded) calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate, HistoryError> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .ok()
        .filter(|d| d.format(DATE_FORMAT).to_string() == date)
        .ok_or_else(|| HistoryError::InvalidDate(date.to_string()))
}

/// Parse an ISO-8601 timestamp to its wall-clock date and time.
///
/// RFC 3339 with `Z` or a numeric offset keeps the written local time (no
/// conversion to UTC), so the date is the one the caller saw.
pub fn parse_timestamp(timestamp: &str) -> Result<NaiveDateTime, HistoryError> {
    let ts = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, format) {
            return Ok(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(ts, DATE_FORMAT) {
        return Ok(d.and_time(NaiveTime::MIN));
    }
    Err(HistoryError::InvalidTimestamp(timestamp.to_string()))
}

// ============ CLI ============

pub fn run_show(config: &Config, date: &str, json: bool) -> anyhow::Result<()> {
    let store = ConversationStore::from_config(config)?;
    let conversations = store.get_history_by_date(date)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "date": date,
                "conversations": conversations,
            }))?
        );
        return Ok(());
    }

    if conversations.is_empty() {
        println!("No conversations on {}.", date);
        return Ok(());
    }
    println!("--- {} ({} conversations) ---", date, conversations.len());
    for c in &conversations {
        print_conversation(c);
    }
    Ok(())
}

pub fn run_recent(config: &Config, days: Option<u32>, json: bool) -> anyhow::Result<()> {
    let store = ConversationStore::from_config(config)?;
    let days = days.unwrap_or(config.history.recent_days);
    let recent = store.get_recent_history(days);

    if json {
        println!("{}", serde_json::to_string_pretty(&recent)?);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No conversations in the last {} days.", days);
        return Ok(());
    }
    for item in &recent {
        println!("[{}]", item.date);
        print_conversation(&item.conversation);
    }
    Ok(())
}

pub fn run_history_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = ConversationStore::from_config(config)?;
    let stats = store.get_conversation_stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Conversation History");
    println!("====================");
    println!();
    println!("  Directory:      {}", store.dir().display());
    println!("  Conversations:  {}", stats.total_conversations);
    println!("  Days:           {}", stats.total_days);
    println!(
        "  First:          {}",
        stats.first_conversation.as_deref().unwrap_or("-")
    );
    println!(
        "  Last:           {}",
        stats.last_conversation.as_deref().unwrap_or("-")
    );

    if !stats.conversations_by_date.is_empty() {
        println!();
        println!("  {:<12} {:>6}", "DATE", "COUNT");
        println!("  {}", "-".repeat(19));
        for (date, count) in &stats.conversations_by_date {
            println!("  {:<12} {:>6}", date, count);
        }
    }
    println!();
    Ok(())
}

pub fn run_delete(config: &Config, date: &str) -> anyhow::Result<()> {
    let store = ConversationStore::from_config(config)?;
    if store.delete_history_by_date(date)? {
        println!("Deleted history for {}.", date);
    } else {
        println!("No history found for {}.", date);
    }
    Ok(())
}

pub fn run_save(
    config: &Config,
    question: &str,
    answer: &str,
    timestamp: Option<String>,
    sources: &[String],
) -> anyhow::Result<()> {
    let store = ConversationStore::from_config(config)?;
    let timestamp = timestamp.unwrap_or_else(|| {
        Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    });
    let conversation = store.append(question, answer, &timestamp, sources)?;
    println!("Saved conversation {} ({}).", conversation.id, conversation.timestamp);
    Ok(())
}

fn print_conversation(c: &Conversation) {
    println!("  {}  id: {}", c.timestamp, c.id);
    println!("  Q: {}", c.question.replace('\n', " "));
    println!("  A: {}", c.answer.replace('\n', " "));
    if !c.sources.is_empty() {
        println!("  sources: {}", c.sources.join(", "));
    }
    println!();
}

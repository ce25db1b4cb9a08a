//! TOML configuration for the corpus roots, retrieval limits, and the
//! conversation history directory.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, see [`load_or_default`]) yields a working configuration rooted at
//! `./rag-data`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::scanner::build_globset;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_articles_dir")]
    pub articles_dir: PathBuf,
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    #[serde(default = "default_article_globs")]
    pub article_globs: Vec<String>,
    #[serde(default = "default_code_globs")]
    pub code_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_readme_name")]
    pub readme_name: String,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            articles_dir: default_articles_dir(),
            projects_dir: default_projects_dir(),
            article_globs: default_article_globs(),
            code_globs: default_code_globs(),
            exclude_globs: Vec::new(),
            readme_name: default_readme_name(),
            follow_symlinks: false,
        }
    }
}

fn default_articles_dir() -> PathBuf {
    PathBuf::from("./rag-data/data-artikel")
}
fn default_projects_dir() -> PathBuf {
    PathBuf::from("./rag-data/data-clone-github")
}
fn default_article_globs() -> Vec<String> {
    ["**/*.txt", "**/*.md", "**/*.json"]
        .iter()
        .map(|g| g.to_string())
        .collect()
}
fn default_code_globs() -> Vec<String> {
    ["py", "js", "ts", "java", "cpp", "c", "html", "css"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}
fn default_readme_name() -> String {
    "README.md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    #[serde(default = "default_max_project_items")]
    pub max_project_items: usize,
    #[serde(default = "default_max_code_files")]
    pub max_code_files: usize,
    #[serde(default = "default_article_preview_chars")]
    pub article_preview_chars: usize,
    #[serde(default = "default_code_preview_chars")]
    pub code_preview_chars: usize,
    #[serde(default = "default_max_code_file_chars")]
    pub max_code_file_chars: usize,
    #[serde(default = "default_short_document_chars")]
    pub short_document_chars: usize,
    #[serde(default = "default_min_keyword_chars")]
    pub min_keyword_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            max_project_items: default_max_project_items(),
            max_code_files: default_max_code_files(),
            article_preview_chars: default_article_preview_chars(),
            code_preview_chars: default_code_preview_chars(),
            max_code_file_chars: default_max_code_file_chars(),
            short_document_chars: default_short_document_chars(),
            min_keyword_chars: default_min_keyword_chars(),
        }
    }
}

fn default_max_articles() -> usize {
    5
}
fn default_max_project_items() -> usize {
    5
}
fn default_max_code_files() -> usize {
    3
}
fn default_article_preview_chars() -> usize {
    1000
}
fn default_code_preview_chars() -> usize {
    800
}
fn default_max_code_file_chars() -> usize {
    5000
}
fn default_short_document_chars() -> usize {
    200
}
fn default_min_keyword_chars() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
            recent_days: default_recent_days(),
        }
    }
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("./rag-data/data-history")
}
fn default_recent_days() -> u32 {
    7
}

impl Config {
    /// Configuration with every directory placed under `root`, using the
    /// on-disk layout of the original data folder.
    pub fn rooted_at(root: &Path) -> Self {
        let mut config = Config::default();
        config.corpus.articles_dir = root.join("data-artikel");
        config.corpus.projects_dir = root.join("data-clone-github");
        config.history.dir = root.join("data-history");
        config
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::default`].
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    tracing::info!(
        "config file {} not found, using defaults",
        path.display()
    );
    let config = Config::default();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let r = &config.retrieval;
    let positive = [
        ("retrieval.max_articles", r.max_articles),
        ("retrieval.max_project_items", r.max_project_items),
        ("retrieval.max_code_files", r.max_code_files),
        ("retrieval.article_preview_chars", r.article_preview_chars),
        ("retrieval.code_preview_chars", r.code_preview_chars),
        ("retrieval.max_code_file_chars", r.max_code_file_chars),
    ];
    for (key, value) in positive {
        if value == 0 {
            bail!("{} must be >= 1", key);
        }
    }

    if r.max_code_files > r.max_project_items {
        bail!(
            "retrieval.max_code_files ({}) must not exceed retrieval.max_project_items ({})",
            r.max_code_files,
            r.max_project_items
        );
    }

    if config.history.recent_days == 0 {
        bail!("history.recent_days must be >= 1");
    }

    let c = &config.corpus;
    if c.readme_name.trim().is_empty() {
        bail!("corpus.readme_name must not be empty");
    }
    build_globset(&c.article_globs).context("Invalid corpus.article_globs")?;
    build_globset(&c.code_globs).context("Invalid corpus.code_globs")?;
    build_globset(&c.exclude_globs).context("Invalid corpus.exclude_globs")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(body: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        std::fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.retrieval.max_articles, 5);
        assert_eq!(cfg.retrieval.max_code_files, 3);
        assert_eq!(cfg.retrieval.short_document_chars, 200);
        assert_eq!(cfg.history.recent_days, 7);
        assert_eq!(cfg.corpus.readme_name, "README.md");
        assert!(cfg.corpus.code_globs.contains(&"**/*.py".to_string()));
    }

    #[test]
    fn test_partial_override() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
articles_dir = "/srv/articles"

[retrieval]
max_articles = 2
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.corpus.articles_dir, PathBuf::from("/srv/articles"));
        assert_eq!(cfg.retrieval.max_articles, 2);
        assert_eq!(cfg.retrieval.max_project_items, 5);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let (_tmp, path) = write_config("[retrieval]\nmax_articles = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("retrieval.max_articles"));
    }

    #[test]
    fn test_code_cap_above_project_cap_rejected() {
        let (_tmp, path) =
            write_config("[retrieval]\nmax_project_items = 2\nmax_code_files = 3\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_bad_glob_rejected() {
        let (_tmp, path) = write_config("[corpus]\narticle_globs = [\"**/[.md\"]\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.history.dir, PathBuf::from("./rag-data/data-history"));
    }

    #[test]
    fn test_rooted_at() {
        let cfg = Config::rooted_at(Path::new("/data"));
        assert_eq!(cfg.corpus.articles_dir, PathBuf::from("/data/data-artikel"));
        assert_eq!(cfg.history.dir, PathBuf::from("/data/data-history"));
    }
}

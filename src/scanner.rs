//! Corpus scanner.
//!
//! Enumerates candidate [`Document`]s from the two corpus roots:
//!
//! - **articles**: every file under `articles_dir` matching
//!   `article_globs`, labeled with its file name;
//! - **projects**: each immediate subdirectory of `projects_dir`. Its
//!   readme (if any) becomes a `github_project` document labeled
//!   `GitHub: <dir>`, and every file matching `code_globs` below it becomes
//!   a `code_file` document labeled `Code: <file>`, unless the file has
//!   `max_code_file_chars` characters or more.
//!
//! `exclude_globs` apply to both roots. Inside projects `.git`, `target` and
//! `node_modules` are skipped as well; article roots keep those names.
//!
//! Unreadable or non-UTF-8 files are skipped with a warning and a missing
//! root is an empty corpus. Only a root that exists but cannot be listed (or
//! is not a directory) is an error, which callers degrade to "no documents". Paths are
//! visited in file-name order so repeated scans of an unchanged tree yield
//! the same sequence.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{Config, CorpusConfig};
use crate::models::{Document, DocumentCategory};

const PROJECT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/target/**", "**/node_modules/**"];

pub struct DocumentScanner {
    articles_dir: PathBuf,
    projects_dir: PathBuf,
    readme_name: String,
    follow_symlinks: bool,
    max_code_file_chars: usize,
    article_set: GlobSet,
    code_set: GlobSet,
    article_excludes: GlobSet,
    project_excludes: GlobSet,
}

impl DocumentScanner {
    pub fn new(corpus: &CorpusConfig, max_code_file_chars: usize) -> Result<Self> {
        let mut project_excludes: Vec<String> =
            PROJECT_EXCLUDES.iter().map(|g| g.to_string()).collect();
        project_excludes.extend(corpus.exclude_globs.iter().cloned());

        Ok(Self {
            articles_dir: corpus.articles_dir.clone(),
            projects_dir: corpus.projects_dir.clone(),
            readme_name: corpus.readme_name.clone(),
            follow_symlinks: corpus.follow_symlinks,
            max_code_file_chars,
            article_set: build_globset(&corpus.article_globs)?,
            code_set: build_globset(&corpus.code_globs)?,
            article_excludes: build_globset(&corpus.exclude_globs)?,
            project_excludes: build_globset(&project_excludes)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.corpus, config.retrieval.max_code_file_chars)
    }

    /// Create both corpus roots if they are missing. Idempotent.
    pub fn ensure_roots(&self) -> Result<()> {
        for root in [&self.articles_dir, &self.projects_dir] {
            std::fs::create_dir_all(root)
                .with_context(|| format!("Failed to create corpus root: {}", root.display()))?;
        }
        Ok(())
    }

    pub fn articles_dir(&self) -> &Path {
        &self.articles_dir
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// All readable article documents, in path order.
    pub fn list_articles(&self) -> Result<Vec<Document>> {
        Ok(self
            .article_paths()?
            .into_iter()
            .filter_map(|path| {
                let content = read_text(&path)?;
                Some(Document {
                    content,
                    source_label: file_name(&path),
                    category: DocumentCategory::Article,
                    origin_path: path,
                })
            })
            .collect())
    }

    /// Readme and code documents of every project, project by project.
    ///
    /// Within a project the readme (when present) comes first, followed by
    /// its code files in path order.
    pub fn list_projects(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for (name, dir) in self.project_dirs()? {
            docs.extend(self.list_project(&name, &dir));
        }
        Ok(docs)
    }

    /// Documents for a single project directory.
    pub fn list_project(&self, name: &str, dir: &Path) -> Vec<Document> {
        let mut docs = Vec::new();

        let readme = dir.join(&self.readme_name);
        if readme.is_file() {
            if let Some(content) = read_text(&readme) {
                docs.push(Document {
                    content,
                    source_label: format!("GitHub: {}", name),
                    category: DocumentCategory::GithubProject,
                    origin_path: dir.to_path_buf(),
                });
            }
        }

        let code_paths = match self.matching_files(dir, &self.code_set, &self.project_excludes) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("skipping code files of project {}: {:#}", name, e);
                Vec::new()
            }
        };
        for path in code_paths {
            let Some(content) = read_text(&path) else {
                continue;
            };
            let doc = Document {
                content,
                source_label: format!("Code: {}", file_name(&path)),
                category: DocumentCategory::CodeFile,
                origin_path: path,
            };
            if doc.char_len() >= self.max_code_file_chars {
                debug!("skipping oversized code file: {}", doc.origin_path.display());
                continue;
            }
            docs.push(doc);
        }

        docs
    }

    /// Number of article files, counted without reading them.
    pub fn count_articles(&self) -> Result<usize> {
        Ok(self.article_paths()?.len())
    }

    pub fn count_projects(&self) -> Result<usize> {
        Ok(self.project_dirs()?.len())
    }

    fn article_paths(&self) -> Result<Vec<PathBuf>> {
        self.matching_files(&self.articles_dir, &self.article_set, &self.article_excludes)
    }

    /// Immediate subdirectories of the project root as `(name, path)`,
    /// sorted by name.
    pub fn project_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match std::fs::read_dir(&self.projects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("project root {} does not exist", self.projects_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list project root: {}", self.projects_dir.display())
                })
            }
        };

        let mut dirs: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .map(|path| (file_name(&path), path))
            .collect();
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    /// Files under `root` whose root-relative path matches `include` and
    /// not `exclude`.
    fn matching_files(
        &self,
        root: &Path,
        include: &GlobSet,
        exclude: &GlobSet,
    ) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            debug!("corpus root {} does not exist", root.display());
            return Ok(Vec::new());
        }
        if !root.is_dir() {
            bail!("Corpus root is not a directory: {}", root.display());
        }

        let mut paths = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself could not be read: nothing below it is reachable.
                Err(e) if e.depth() == 0 => {
                    return Err(e)
                        .with_context(|| format!("Failed to walk {}", root.display()))
                }
                Err(e) => {
                    warn!("error walking {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude.is_match(&rel_str) {
                continue;
            }
            if !include.is_match(&rel_str) {
                continue;
            }

            paths.push(path.to_path_buf());
        }
        Ok(paths)
    }
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("skipping unreadable file {}: {}", path.display(), e);
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

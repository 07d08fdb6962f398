/*!
Tiered documentation cache.

Two documents, cached independently:
  Overview  -> `<base>/llms.txt`
  Full      -> `<base>/llms-full.txt`

get(kind) consults, in order:
  1. memory entry younger than the TTL          (no I/O)
  2. live fetch      -> memory + best-effort disk write
  3. disk entry younger than the TTL -> memory   (expired entries are deleted)
  4. compiled-in fallback text

The full document is prefixed with the project-context block whenever it
comes from the network or the fallback. `get` never fails.

Concurrent misses may fetch twice; whichever finishes last wins.
*/

pub mod fetch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::analysis::AnalysisTask;
use crate::context::ProjectContext;
pub use fetch::{DocsFetcher, FetchError, HttpFetcher};

pub const DEFAULT_BASE_URL: &str = "https://docs.vendure.io";
pub const DEFAULT_CACHE_DIR: &str = ".vendure-docs-cache";

const FALLBACK_OVERVIEW: &str = include_str!("fallback/llms.txt");
const FALLBACK_FULL: &str = include_str!("fallback/llms-full.txt");

/// Which of the two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Overview,
    Full,
}

impl DocumentKind {
    pub fn filename(&self) -> &'static str {
        match self {
            DocumentKind::Overview => "llms.txt",
            DocumentKind::Full => "llms-full.txt",
        }
    }

    /// Stable disk key.
    pub fn cache_file(&self) -> String {
        format!("{}.json", self.filename())
    }

    fn fallback(&self) -> &'static str {
        match self {
            DocumentKind::Overview => FALLBACK_OVERVIEW,
            DocumentKind::Full => FALLBACK_FULL,
        }
    }
}

/// One cached document; `timestamp` is epoch milliseconds of the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDocument {
    pub content: String,
    pub timestamp: i64,
}

impl CachedDocument {
    pub fn now(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_valid(&self, ttl: Duration) -> bool {
        Utc::now().timestamp_millis() - self.timestamp < ttl.num_milliseconds()
    }
}

#[derive(Debug, Clone)]
pub struct DocsCacheConfig {
    pub base_url: Url,
    pub cache_dir: PathBuf,
    pub ttl: Duration,
    /// Prefix of the tool names listed in the project-context block.
    pub tool_prefix: String,
}

impl DocsCacheConfig {
    /// Normalizes `base_url` so document names join under its path.
    pub fn new(mut base_url: Url, cache_dir: impl Into<PathBuf>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            cache_dir: cache_dir.into(),
            ttl: Duration::hours(24),
            tool_prefix: "vendure".into(),
        }
    }

    pub fn with_tool_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tool_prefix = prefix.into();
        self
    }
}

pub struct DocsCache {
    config: DocsCacheConfig,
    fetcher: Arc<dyn DocsFetcher>,
    project: ProjectContext,
    overview: RwLock<Option<CachedDocument>>,
    full: RwLock<Option<CachedDocument>>,
}

impl DocsCache {
    pub fn new(config: DocsCacheConfig, fetcher: Arc<dyn DocsFetcher>, project: ProjectContext) -> Self {
        Self {
            config,
            fetcher,
            project,
            overview: RwLock::new(None),
            full: RwLock::new(None),
        }
    }

    pub async fn get(&self, kind: DocumentKind) -> String {
        if let Some(cached) = self.slot(kind).read().await.as_ref()
            && cached.is_valid(self.config.ttl)
        {
            tracing::trace!(document = kind.filename(), "memory cache hit");
            return cached.content.clone();
        }

        match self.fetch(kind).await {
            Ok(content) => {
                let content = self.decorate(kind, content);
                let entry = CachedDocument::now(content.clone());
                *self.slot(kind).write().await = Some(entry.clone());
                self.save_to_disk(kind, &entry).await;
                content
            }
            Err(e) => {
                tracing::warn!(document = kind.filename(), error = %e, "fetch failed, trying disk cache");
                if let Some(entry) = self.load_from_disk(kind).await {
                    let content = entry.content.clone();
                    *self.slot(kind).write().await = Some(entry);
                    return content;
                }
                tracing::warn!(document = kind.filename(), "using compiled-in fallback");
                self.decorate(kind, kind.fallback().to_string())
            }
        }
    }

    fn slot(&self, kind: DocumentKind) -> &RwLock<Option<CachedDocument>> {
        match kind {
            DocumentKind::Overview => &self.overview,
            DocumentKind::Full => &self.full,
        }
    }

    pub fn document_url(&self, kind: DocumentKind) -> Result<Url, url::ParseError> {
        self.config.base_url.join(kind.filename())
    }

    async fn fetch(&self, kind: DocumentKind) -> Result<String, FetchError> {
        let url = self
            .document_url(kind)
            .map_err(|e| FetchError::Other(e.to_string()))?;
        tracing::debug!(%url, "fetching documentation");
        self.fetcher.fetch(&url).await
    }

    fn decorate(&self, kind: DocumentKind, content: String) -> String {
        match kind {
            DocumentKind::Overview => content,
            DocumentKind::Full => format!("{}{}", self.project_context_block(), content),
        }
    }

    /// Header prepended to the full document.
    pub fn project_context_block(&self) -> String {
        let prefix = &self.config.tool_prefix;
        let tasks = AnalysisTask::ALL
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "\n# Current Project Context\nProject Path: {}\n\n## Available MCP Tools\n\
             - {prefix}_add: Add plugins, entities, services to your project\n\
             - {prefix}_migrate: Run database migrations\n\
             - {prefix}_analyse: Analyze project structure (tasks: {tasks})\n\n---\n\n",
            self.project.project_path().display()
        )
    }

    fn cache_path(&self, kind: DocumentKind) -> PathBuf {
        self.config.cache_dir.join(kind.cache_file())
    }

    async fn save_to_disk(&self, kind: DocumentKind, entry: &CachedDocument) {
        let path = self.cache_path(kind);
        if let Err(e) = write_entry(&self.config.cache_dir, &path, entry).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to write disk cache");
        }
    }

    async fn load_from_disk(&self, kind: DocumentKind) -> Option<CachedDocument> {
        let path = self.cache_path(kind);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no disk cache entry");
                return None;
            }
        };
        let entry: CachedDocument = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable disk cache entry");
                return None;
            }
        };
        if entry.is_valid(self.config.ttl) {
            return Some(entry);
        }
        tracing::debug!(path = %path.display(), "removing stale disk cache entry");
        let _ = tokio::fs::remove_file(&path).await;
        None
    }

    #[cfg(test)]
    async fn seed_memory(&self, kind: DocumentKind, entry: CachedDocument) {
        *self.slot(kind).write().await = Some(entry);
    }

    #[cfg(test)]
    async fn memory(&self, kind: DocumentKind) -> Option<CachedDocument> {
        self.slot(kind).read().await.clone()
    }
}

async fn write_entry(dir: &Path, path: &Path, entry: &CachedDocument) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_string(entry)?;
    tokio::fs::write(path, json).await
}

/* ---- Tests ---- */

//! Per-vault indexer: full scans, cache reuse, incremental updates and
//! optional file watching.
//!
//! Mutations (scans, file notifications, watch batches) are serialized by a
//! mutation lock. File I/O and parsing happen before the state write lock is
//! taken, so readers only ever wait for the short swap.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::cache::{CacheError, PageCache};
use super::store::PageStore;
use super::structures::VaultIndex;
use super::types::{
    Document, IndexEvent, IndexStats, IndexStatus, IndexingError, PageMetadata, ScanReport,
};
use super::watcher::{DEFAULT_DEBOUNCE, VaultWatcher, WatchError, WatchEvent};
use crate::frontmatter::{self, FrontmatterParseError};
use crate::query::{DocumentSet, FilterCollection, StructuredQuery};
use crate::vault::{
    FileSystem, FsError, LocalFileSystem, extract_page, is_excluded_relative, is_markdown_file,
    normalize_exclusions,
};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to initialize vault at {path}: {source}")]
    Initialization {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("index is not ready (status: {0})")]
    NotReady(IndexStatus),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("no cache directory configured")]
    NoCacheDir,

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Io(#[from] FsError),

    #[error("indexer has been stopped")]
    Stopped,
}

/// Why a single file could not be indexed.
#[derive(Debug, Error)]
enum PageError {
    #[error(transparent)]
    Io(#[from] FsError),

    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] FrontmatterParseError),
}

/// Result of one incremental notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Indexed,
    Removed,
    /// Not a markdown file, outside the vault, excluded, or unknown.
    Ignored,
    /// The file could not be read or parsed; any previous record is kept.
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub root: PathBuf,
    pub use_cache: bool,
    /// Directory holding cache databases. Caching is skipped when unset.
    pub cache_dir: Option<PathBuf>,
    pub watch: bool,
    pub debounce: Duration,
    /// Folders to skip, relative to the root or absolute below it.
    pub excluded_folders: Vec<PathBuf>,
}

impl IndexerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_cache: false,
            cache_dir: None,
            watch: false,
            debounce: DEFAULT_DEBOUNCE,
            excluded_folders: Vec::new(),
        }
    }

    /// Enable the page cache, stored under `dir`.
    pub fn with_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.use_cache = true;
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_excluded_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.excluded_folders = folders;
        self
    }
}

#[derive(Debug, Default)]
struct State {
    status: IndexStatus,
    /// Canonical root once initialized.
    root: Option<PathBuf>,
    excluded: Vec<PathBuf>,
    store: PageStore,
    index: VaultIndex,
    errors: BTreeMap<PathBuf, String>,
    last_scan_ms: u64,
    init_error: Option<String>,
}

struct Inner {
    config: IndexerConfig,
    fs: Arc<dyn FileSystem>,
    state: RwLock<State>,
    mutation: Mutex<()>,
    cancel: AtomicBool,
    subscribers: Mutex<Vec<Sender<IndexEvent>>>,
    watcher: Mutex<Option<VaultWatcher>>,
}

/// Index of one vault. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct VaultIndexer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VaultIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("VaultIndexer")
            .field("root", &self.inner.config.root)
            .field("status", &state.status)
            .field("pages", &state.store.len())
            .finish()
    }
}

impl VaultIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self::with_file_system(config, Arc::new(LocalFileSystem))
    }

    pub fn with_file_system(config: IndexerConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                fs,
                state: RwLock::new(State::default()),
                mutation: Mutex::new(()),
                cancel: AtomicBool::new(false),
                subscribers: Mutex::new(Vec::new()),
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.inner.config
    }

    /// The vault root; canonical once initialized.
    pub fn root(&self) -> PathBuf {
        self.inner.state.read().root.clone().unwrap_or_else(|| self.inner.config.root.clone())
    }

    pub fn status(&self) -> IndexStatus {
        self.inner.state.read().status
    }

    pub fn is_ready(&self) -> bool {
        self.status() == IndexStatus::Ready
    }

    /// Message of the failure that put the indexer into the error state.
    pub fn init_error(&self) -> Option<String> {
        self.inner.state.read().init_error.clone()
    }

    /// Receive status, progress and per-page events from now on.
    pub fn subscribe(&self) -> Receiver<IndexEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    /// Ask a running scan to stop after the current file.
    pub fn cancel(&self) {
        self.inner.cancel.store(true, Ordering::SeqCst);
    }

    /// Build the index from the cache when usable, otherwise by a full scan.
    ///
    /// Can be called again on a ready indexer to re-scan. A cancelled scan
    /// commits the pages processed so far.
    pub fn initialize(&self) -> Result<ScanReport, IndexerError> {
        let _guard = self.inner.mutation.lock();
        if self.status() == IndexStatus::Stopped {
            return Err(IndexerError::Stopped);
        }
        self.inner.cancel.store(false, Ordering::SeqCst);
        self.set_status(IndexStatus::Initializing);

        let result = self.prepare_root().and_then(|root| {
            let report = self.scan(&root)?;
            Ok((root, report))
        });

        let (root, report) = match result {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!("Failed to index {}: {e}", self.inner.config.root.display());
                self.inner.state.write().init_error = Some(e.to_string());
                self.set_status(IndexStatus::Error);
                return Err(e);
            }
        };

        if self.inner.config.use_cache
            && !report.cancelled
            && let Err(e) = self.persist_locked(&root)
        {
            tracing::warn!("Failed to write cache for {}: {e}", root.display());
        }

        self.set_status(IndexStatus::Ready);

        if self.inner.config.watch
            && !report.cancelled
            && let Err(e) = self.start_watching()
        {
            tracing::warn!("File watching disabled for {}: {e}", root.display());
        }

        Ok(report)
    }

    /// Re-scan the whole vault, reusing unchanged cache entries.
    pub fn rescan(&self) -> Result<ScanReport, IndexerError> {
        self.initialize()
    }

    /// Start watching the vault root. Does nothing if already watching.
    pub fn start_watching(&self) -> Result<(), IndexerError> {
        let root = self.ready_context()?.0;
        let mut slot = self.inner.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let watcher = VaultWatcher::start(&root, self.inner.config.debounce, move |events| {
            if let Some(inner) = weak.upgrade() {
                VaultIndexer { inner }.apply_watch_events(events);
            }
        })?;
        *slot = Some(watcher);
        Ok(())
    }

    pub fn stop_watching(&self) {
        let watcher = self.inner.watcher.lock().take();
        if let Some(mut watcher) = watcher {
            watcher.stop();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.inner.watcher.lock().is_some()
    }

    /// Stop watching, cancel scans and drop all indexed state.
    pub fn shutdown(&self) {
        self.cancel();
        self.stop_watching();

        let _guard = self.inner.mutation.lock();
        {
            let mut state = self.inner.state.write();
            state.store.clear();
            state.index = VaultIndex::new();
            state.errors.clear();
        }
        self.set_status(IndexStatus::Stopped);
        self.inner.subscribers.lock().clear();
        tracing::info!("Stopped indexer for {}", self.inner.config.root.display());
    }

    /// Write the current pages to the cache.
    pub fn persist(&self) -> Result<(), IndexerError> {
        let _guard = self.inner.mutation.lock();
        let root = self.ready_context()?.0;
        self.persist_locked(&root)
    }

    pub fn handle_file_added(&self, path: &Path) -> Result<UpdateOutcome, IndexerError> {
        self.upsert(path)
    }

    pub fn handle_file_changed(&self, path: &Path) -> Result<UpdateOutcome, IndexerError> {
        self.upsert(path)
    }

    /// Remove a page. A directory path removes every page below it.
    pub fn handle_file_removed(&self, path: &Path) -> Result<UpdateOutcome, IndexerError> {
        let _guard = self.inner.mutation.lock();
        let (root, excluded) = self.ready_context()?;
        let Some(path) = self.locate(&root, path) else {
            return Ok(UpdateOutcome::Ignored);
        };
        if excluded_below(&root, &excluded, &path) {
            return Ok(UpdateOutcome::Ignored);
        }

        let removed = {
            let mut state = self.inner.state.write();
            let state = &mut *state;

            let targets: Vec<PathBuf> = if state.store.contains(&path) {
                vec![path.clone()]
            } else {
                state.store.paths().iter().filter(|p| p.starts_with(&path)).cloned().collect()
            };

            let mut removed = Vec::new();
            for target in targets {
                if let Some(old) = state.store.remove(&target) {
                    state.index.remove(&old);
                    removed.push(target);
                }
            }
            state.errors.retain(|p, _| !p.starts_with(&path));
            removed
        };

        if removed.is_empty() {
            return Ok(UpdateOutcome::Ignored);
        }
        for path in removed {
            tracing::debug!("Removed {}", path.display());
            self.emit(&IndexEvent::PageRemoved { path });
        }
        Ok(UpdateOutcome::Removed)
    }

    /// Apply a batch of debounced watch events.
    ///
    /// The kind of each event is only a hint: whether the path exists on
    /// disk when the batch is applied decides between update and removal.
    pub fn apply_watch_events(&self, events: Vec<WatchEvent>) {
        for event in events {
            if self.status() == IndexStatus::Stopped {
                return;
            }
            if let Err(e) = self.apply_watch_event(&event) {
                tracing::warn!("Watch update for {} failed: {e}", event.path.display());
            }
        }
    }

    fn apply_watch_event(&self, event: &WatchEvent) -> Result<(), IndexerError> {
        let stat = match self.inner.fs.stat(&event.path) {
            Ok(stat) => stat,
            Err(e) if e.is_not_found() => {
                self.handle_file_removed(&event.path)?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if stat.is_file {
            self.upsert(&event.path)?;
        } else if stat.is_dir {
            // A directory moved into the vault arrives as a single event.
            let root = self.ready_context()?.0;
            if self.locate(&root, &event.path).is_none() {
                return Ok(());
            }
            for file in self.inner.fs.list_markdown(&event.path, &[])? {
                self.upsert(&file)?;
            }
        }
        Ok(())
    }

    fn upsert(&self, path: &Path) -> Result<UpdateOutcome, IndexerError> {
        let _guard = self.inner.mutation.lock();
        let (root, excluded) = self.ready_context()?;
        let Some(path) = self.locate(&root, path) else {
            return Ok(UpdateOutcome::Ignored);
        };
        if !is_markdown_file(&path) || excluded_below(&root, &excluded, &path) {
            return Ok(UpdateOutcome::Ignored);
        }

        match self.parse_page(&root, &path) {
            Ok(page) => {
                {
                    let mut state = self.inner.state.write();
                    let state = &mut *state;
                    if let Some(old) = state.store.insert(page.clone()) {
                        state.index.remove(&old);
                    }
                    state.index.insert(&page);
                    state.errors.remove(&path);
                }
                tracing::debug!("Indexed {}", path.display());
                self.emit(&IndexEvent::PageIndexed { path });
                Ok(UpdateOutcome::Indexed)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Failed to index {}: {message}", path.display());
                self.inner.state.write().errors.insert(path.clone(), message.clone());
                self.emit(&IndexEvent::PageFailed { path, message: message.clone() });
                Ok(UpdateOutcome::Failed { message })
            }
        }
    }

    /// All pages in indexing order.
    pub fn get_all_documents(&self) -> Vec<PageMetadata> {
        self.inner.state.read().store.to_vec()
    }

    pub fn get(&self, path: &Path) -> Option<PageMetadata> {
        self.inner.state.read().store.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Document view of a page, with its body read from disk.
    pub fn document(&self, path: &Path) -> Result<Option<Document>, IndexerError> {
        let Some(page) = self.get(path) else {
            return Ok(None);
        };
        let body = self.read_body(&page.path)?;
        Ok(Some(Document::new(page, body)))
    }

    pub fn documents_with_tag(&self, tag: &str) -> Vec<PageMetadata> {
        let state = self.inner.state.read();
        state
            .index
            .paths_with_tag(tag)
            .iter()
            .filter_map(|p| state.store.get(p))
            .cloned()
            .collect()
    }

    pub fn documents_in_folder(&self, prefix: &str) -> Vec<PageMetadata> {
        let state = self.inner.state.read();
        state
            .index
            .paths_in_folder(prefix)
            .iter()
            .filter_map(|p| state.store.get(p))
            .cloned()
            .collect()
    }

    pub fn outgoing_links(&self, path: &Path) -> Vec<String> {
        self.inner.state.read().index.outgoing_links(path).to_vec()
    }

    pub fn backlinks(&self, path: &Path) -> Vec<PathBuf> {
        self.inner.state.read().index.backlinks(path).to_vec()
    }

    pub fn resolve_link(&self, raw: &str) -> Option<PathBuf> {
        self.inner.state.read().index.resolve_link(raw).map(Path::to_path_buf)
    }

    /// Tags with their page counts, sorted by tag.
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        self.inner.state.read().index.tag_counts()
    }

    /// Pages matching `query`, in indexing order.
    pub fn query(&self, query: &StructuredQuery) -> Vec<PageMetadata> {
        self.filter_pages(query.needs_content(), |page, body| query.matches(page, body))
    }

    /// Pages matching a filter collection, in indexing order.
    pub fn query_filters(&self, filters: &FilterCollection) -> Vec<PageMetadata> {
        let now = Utc::now();
        self.filter_pages(filters.needs_content(), |page, body| filters.matches(page, body, now))
    }

    /// A lazy selection of every document.
    pub fn selection(&self) -> DocumentSet {
        self.select(StructuredQuery::new())
    }

    /// A lazy selection of the documents matching `query`, evaluated on first
    /// use.
    pub fn select(&self, query: StructuredQuery) -> DocumentSet {
        let indexer = self.clone();
        DocumentSet::from_loader(move || {
            indexer
                .query(&query)
                .into_iter()
                .filter_map(|page| match indexer.read_body(&page.path) {
                    Ok(body) => Some(Document::new(page, body)),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {e}", page.path.display());
                        None
                    }
                })
                .collect()
        })
    }

    pub fn get_stats(&self) -> IndexStats {
        let state = self.inner.state.read();
        IndexStats {
            total_documents: state.store.len(),
            total_tags: state.index.tag_count(),
            total_links: state.index.link_count(),
            dangling_links: state.index.dangling_link_count(),
            indexing_errors: state.errors.len(),
            last_scan_ms: state.last_scan_ms,
            status: state.status,
        }
    }

    pub fn get_indexing_errors(&self) -> Vec<IndexingError> {
        self.inner
            .state
            .read()
            .errors
            .iter()
            .map(|(path, message)| IndexingError { path: path.clone(), message: message.clone() })
            .collect()
    }

    /// Order-independent view of the derived structures, rebuilt from the
    /// store alongside the live one.
    pub fn index_snapshots(&self) -> (super::IndexSnapshot, super::IndexSnapshot) {
        let state = self.inner.state.read();
        (state.index.snapshot(), VaultIndex::rebuild(&state.store).snapshot())
    }

    fn filter_pages(
        &self,
        needs_content: bool,
        predicate: impl Fn(&PageMetadata, Option<&str>) -> bool,
    ) -> Vec<PageMetadata> {
        self.get_all_documents()
            .into_iter()
            .filter(|page| {
                if !needs_content {
                    return predicate(page, None);
                }
                match self.read_body(&page.path) {
                    Ok(body) => predicate(page, Some(&body)),
                    Err(e) => {
                        tracing::debug!("Skipping {} in content query: {e}", page.path.display());
                        false
                    }
                }
            })
            .collect()
    }

    fn read_body(&self, path: &Path) -> Result<String, FsError> {
        let raw = self.inner.fs.read_to_string(path)?;
        Ok(match frontmatter::parse(&raw) {
            Ok(parsed) => parsed.body,
            Err(_) => raw,
        })
    }

    fn prepare_root(&self) -> Result<PathBuf, IndexerError> {
        let configured = &self.inner.config.root;
        let initialization =
            |source: FsError| IndexerError::Initialization { path: configured.clone(), source };

        let root = self.inner.fs.canonicalize(configured).map_err(initialization)?;
        let stat = self.inner.fs.stat(&root).map_err(initialization)?;
        if !stat.is_dir {
            return Err(initialization(FsError::from_io(
                &root,
                io::Error::new(io::ErrorKind::NotADirectory, "vault root is not a directory"),
            )));
        }

        let excluded: Vec<PathBuf> = self
            .inner
            .config
            .excluded_folders
            .iter()
            .map(|p| p.strip_prefix(configured).map_or_else(|_| p.clone(), Path::to_path_buf))
            .collect();
        let excluded = normalize_exclusions(&root, excluded);
        let mut state = self.inner.state.write();
        state.root = Some(root.clone());
        state.excluded = excluded;
        state.init_error = None;
        Ok(root)
    }

    fn scan(&self, root: &Path) -> Result<ScanReport, IndexerError> {
        let start = Instant::now();
        let excluded = self.inner.state.read().excluded.clone();
        let files = self
            .inner
            .fs
            .list_markdown(root, &excluded)
            .map_err(|source| IndexerError::Initialization { path: root.to_path_buf(), source })?;

        let cached = if self.inner.config.use_cache { self.load_cache(root) } else { None };
        tracing::info!(
            "Scanning {} ({} files, {})",
            root.display(),
            files.len(),
            if cached.is_some() { "cache found" } else { "full scan" }
        );

        let on_disk: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        let mut store = PageStore::new();
        let mut errors = BTreeMap::new();
        let mut report = ScanReport { files_found: files.len(), ..ScanReport::default() };
        let total = files.len();
        let mut current = 0;

        for page in cached.unwrap_or_default() {
            if !on_disk.contains(page.path.as_path()) {
                continue;
            }
            if self.inner.cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            current += 1;
            self.emit(&IndexEvent::ScanProgress { current, total, path: page.path.clone() });

            match self.inner.fs.stat(&page.path) {
                Ok(stat) if page.is_fresh(&stat) => {
                    store.insert(page);
                    report.pages_from_cache += 1;
                }
                _ => self.index_into(root, &page.path, &mut store, &mut errors, &mut report),
            }
        }

        for path in &files {
            if report.cancelled {
                break;
            }
            if store.contains(path) || errors.contains_key(path) {
                continue;
            }
            if self.inner.cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            current += 1;
            self.emit(&IndexEvent::ScanProgress { current, total, path: path.clone() });
            self.index_into(root, path, &mut store, &mut errors, &mut report);
        }

        let index = VaultIndex::rebuild(&store);
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        {
            let mut state = self.inner.state.write();
            state.store = store;
            state.index = index;
            state.errors = errors;
            state.last_scan_ms = report.duration_ms;
        }

        if report.cancelled {
            tracing::info!("Scan of {} cancelled after {current} files", root.display());
        } else {
            tracing::info!(
                "Indexed {} pages ({} from cache, {} skipped) in {}ms",
                report.pages_indexed + report.pages_from_cache,
                report.pages_from_cache,
                report.pages_skipped,
                report.duration_ms
            );
        }
        Ok(report)
    }

    fn index_into(
        &self,
        root: &Path,
        path: &Path,
        store: &mut PageStore,
        errors: &mut BTreeMap<PathBuf, String>,
        report: &mut ScanReport,
    ) {
        match self.parse_page(root, path) {
            Ok(page) => {
                tracing::debug!("Indexed {}", path.display());
                store.insert(page);
                report.pages_indexed += 1;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Failed to index {}: {message}", path.display());
                self.emit(&IndexEvent::PageFailed {
                    path: path.to_path_buf(),
                    message: message.clone(),
                });
                errors.insert(path.to_path_buf(), message);
                report.pages_skipped += 1;
            }
        }
    }

    fn parse_page(&self, root: &Path, path: &Path) -> Result<PageMetadata, PageError> {
        let stat = self.inner.fs.stat(path)?;
        let content = self.inner.fs.read_to_string(path)?;
        let extracted = extract_page(&content, path)?;
        Ok(PageMetadata::new(path, root, extracted, stat))
    }

    fn load_cache(&self, root: &Path) -> Option<Vec<PageMetadata>> {
        let dir = self.inner.config.cache_dir.as_ref()?;
        let path = PageCache::path_for(dir, root);
        if !path.exists() {
            return None;
        }

        match PageCache::open(&path, root).and_then(|cache| cache.load()) {
            Ok(pages) => {
                tracing::info!("Loaded {} cached pages from {}", pages.len(), path.display());
                Some(pages)
            }
            Err(e) => {
                tracing::warn!("Ignoring unusable cache {}: {e}", path.display());
                None
            }
        }
    }

    fn persist_locked(&self, root: &Path) -> Result<(), IndexerError> {
        let dir = self.inner.config.cache_dir.as_ref().ok_or(IndexerError::NoCacheDir)?;
        let pages = self.get_all_documents();

        let mut cache = PageCache::open(&PageCache::path_for(dir, root), root)?;
        cache.save(&pages)?;
        tracing::debug!("Cached {} pages for {}", pages.len(), root.display());
        Ok(())
    }

    /// Root and exclusions of a ready indexer.
    fn ready_context(&self) -> Result<(PathBuf, Vec<PathBuf>), IndexerError> {
        let state = self.inner.state.read();
        match (state.status, &state.root) {
            (IndexStatus::Ready, Some(root)) => Ok((root.clone(), state.excluded.clone())),
            (IndexStatus::Stopped, _) => Err(IndexerError::Stopped),
            (status, _) => Err(IndexerError::NotReady(status)),
        }
    }

    /// Absolute path below the canonical root, or `None` if outside the
    /// vault. Relative paths are taken from the root; paths under the
    /// configured (non-canonical) root are rebased.
    fn locate(&self, root: &Path, path: &Path) -> Option<PathBuf> {
        let candidate = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        if candidate.starts_with(root) {
            return (candidate != root).then_some(candidate);
        }
        let relative = candidate.strip_prefix(&self.inner.config.root).ok()?;
        (!relative.as_os_str().is_empty()).then(|| root.join(relative))
    }

    fn set_status(&self, to: IndexStatus) {
        let from = std::mem::replace(&mut self.inner.state.write().status, to);
        if from != to {
            tracing::debug!("Indexer for {}: {from} -> {to}", self.inner.config.root.display());
            self.emit(&IndexEvent::StatusChanged { from, to });
        }
    }

    fn emit(&self, event: &IndexEvent) {
        self.inner.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn excluded_below(root: &Path, excluded: &[PathBuf], path: &Path) -> bool {
    path.strip_prefix(root).map_or(true, |relative| is_excluded_relative(relative, excluded))
}

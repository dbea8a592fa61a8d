//! Immutable, lazily materialized document selections.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::QueryError;
use crate::index::Document;

type Loader = Arc<dyn Fn() -> Vec<Document> + Send + Sync>;

/// A handle on a sequence of documents.
///
/// Combinators never touch their inputs: each returns a new set whose
/// documents are computed on first [`DocumentSet::materialize`] and cached.
/// Clones share the same cache.
#[derive(Clone)]
pub struct DocumentSet {
    inner: Arc<SetInner>,
}

struct SetInner {
    load: Loader,
    limit: Option<usize>,
    cache: OnceLock<Vec<Document>>,
}

impl fmt::Debug for DocumentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSet")
            .field("limit", &self.inner.limit)
            .field("materialized", &self.inner.cache.get().map(Vec::len))
            .finish()
    }
}

impl DocumentSet {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let documents = Arc::new(documents);
        Self::from_loader(move || documents.to_vec())
    }

    /// A set whose documents are produced by `load` when first needed.
    pub fn from_loader(load: impl Fn() -> Vec<Document> + Send + Sync + 'static) -> Self {
        Self::with_limit(Arc::new(load), None)
    }

    pub fn empty() -> Self {
        Self::from_documents(Vec::new())
    }

    fn with_limit(load: Loader, limit: Option<usize>) -> Self {
        Self { inner: Arc::new(SetInner { load, limit, cache: OnceLock::new() }) }
    }

    /// The documents of this set, computed once.
    pub fn materialize(&self) -> &[Document] {
        self.inner.cache.get_or_init(|| {
            let mut documents = (self.inner.load)();
            if let Some(limit) = self.inner.limit {
                documents.truncate(limit);
            }
            documents
        })
    }

    pub fn len(&self) -> usize {
        self.materialize().len()
    }

    pub fn is_empty(&self) -> bool {
        self.materialize().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.materialize().iter().any(|d| d.path == path)
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.materialize().iter().map(|d| d.path.as_path()).collect()
    }

    /// Whether two handles are the same set instance.
    pub fn same_instance(&self, other: &DocumentSet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn filter(
        &self,
        predicate: impl Fn(&Document) -> bool + Send + Sync + 'static,
    ) -> DocumentSet {
        let source = self.clone();
        Self::from_loader(move || {
            source.materialize().iter().filter(|d| predicate(d)).cloned().collect()
        })
    }

    /// Documents in either set: this set's first, then the other's not
    /// already present. Deduplicated by path.
    pub fn union(&self, other: &DocumentSet) -> DocumentSet {
        let (a, b) = (self.clone(), other.clone());
        Self::from_loader(move || {
            let mut seen = HashSet::new();
            a.materialize()
                .iter()
                .chain(b.materialize())
                .filter(|d| seen.insert(d.path.clone()))
                .cloned()
                .collect()
        })
    }

    /// Documents of this set whose path is also in `other`.
    pub fn intersect(&self, other: &DocumentSet) -> DocumentSet {
        let (a, b) = (self.clone(), other.clone());
        Self::from_loader(move || {
            let keep: HashSet<&Path> = b.materialize().iter().map(|d| d.path.as_path()).collect();
            a.materialize().iter().filter(|d| keep.contains(d.path.as_path())).cloned().collect()
        })
    }

    /// Documents of this set whose path is not in `other`.
    pub fn difference(&self, other: &DocumentSet) -> DocumentSet {
        let (a, b) = (self.clone(), other.clone());
        Self::from_loader(move || {
            let exclude: HashSet<&Path> =
                b.materialize().iter().map(|d| d.path.as_path()).collect();
            a.materialize()
                .iter()
                .filter(|d| !exclude.contains(d.path.as_path()))
                .cloned()
                .collect()
        })
    }

    /// The first `n` documents. The cut happens on materialization; the
    /// source is not read here. Returns this same instance when it is known
    /// to hold at most `n` documents already.
    pub fn limit(&self, n: usize) -> Result<DocumentSet, QueryError> {
        if n < 1 {
            return Err(QueryError::InvalidLimit(n));
        }
        let within = match self.inner.cache.get() {
            Some(documents) => documents.len() <= n,
            None => self.inner.limit.is_some_and(|pending| pending <= n),
        };
        if within {
            return Ok(self.clone());
        }

        let source = self.clone();
        Ok(Self::with_limit(Arc::new(move || source.materialize().to_vec()), Some(n)))
    }
}

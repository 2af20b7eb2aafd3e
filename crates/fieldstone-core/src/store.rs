use crate::{document::Document, error::BackendError, predicate::Predicate, schema::Schema};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::Debug,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};
use time::OffsetDateTime;
use ulid::Ulid;

///
/// SortDir
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

///
/// SortField
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SortField {
    pub path: String,
    pub dir: SortDir,
}

impl SortField {
    #[must_use]
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dir: SortDir::Asc,
        }
    }

    #[must_use]
    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dir: SortDir::Desc,
        }
    }
}

///
/// Query
///
/// One find request against the collaborator: a conjunctive predicate,
/// sort directives, a column projection (empty = all paths), and a
/// skip/limit window.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct Query {
    pub predicate: Predicate,
    pub sort: Vec<SortField>,
    pub columns: Vec<String>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// AND another condition onto the query.
    pub fn and_where(&mut self, predicate: Predicate) {
        let current = std::mem::take(&mut self.predicate);
        self.predicate = current.and(predicate).simplify();
    }
}

///
/// Backend
///
/// The persistence collaborator contract. The engine depends on nothing
/// beyond these four operations; timeouts and retries are the
/// collaborator's responsibility and its errors pass through unchanged.
///

pub trait Backend: Debug + Send + Sync {
    /// Accept a compiled schema for a list key.
    fn compile(&self, list_key: &str, schema: &Schema) -> Result<(), BackendError>;

    /// Fetch documents matching a query.
    fn find(&self, list_key: &str, query: &Query) -> Result<Vec<Document>, BackendError>;

    /// Count documents matching a predicate.
    fn count(&self, list_key: &str, predicate: &Predicate) -> Result<u64, BackendError>;

    /// Upsert one document, assigning an id when it has none.
    fn save(&self, list_key: &str, doc: &mut Document) -> Result<(), BackendError>;
}

///
/// MemoryBackend
///
/// In-process document tables with predicate evaluation. Serves the
/// test-suite and lightweight embedding; anything heavier belongs
/// behind a real driver implementing [`Backend`].
///

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<BTreeMap<String, Vec<Document>>>,
    schemas: RwLock<BTreeMap<String, Schema>>,
    // NOTE: monotonic id entropy; ulid's rand feature stays off
    counter: AtomicU64,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> Ulid {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let millis = u64::try_from(millis).unwrap_or_default();
        let entropy = self.counter.fetch_add(1, Ordering::Relaxed);
        Ulid::from_parts(millis, u128::from(entropy))
    }

    /// Seed a document directly, bypassing field validation. Test and
    /// fixture convenience.
    pub fn seed(&self, list_key: &str, mut doc: Document) -> Result<Ulid, BackendError> {
        self.save(list_key, &mut doc)?;
        doc.id()
            .ok_or_else(|| BackendError::new("seeded document has no id"))
    }

    /// Compiled schema for a list, when one was accepted.
    #[must_use]
    pub fn schema(&self, list_key: &str) -> Option<Schema> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(list_key)
            .cloned()
    }
}

impl Backend for MemoryBackend {
    fn compile(&self, list_key: &str, schema: &Schema) -> Result<(), BackendError> {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(list_key.to_string(), schema.clone());
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(list_key.to_string())
            .or_default();

        Ok(())
    }

    fn find(&self, list_key: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get(list_key)
            .ok_or_else(|| BackendError::new(format!("unknown collection: {list_key}")))?;

        let mut matched: Vec<Document> = table
            .iter()
            .filter(|doc| query.predicate.matches(doc))
            .cloned()
            .collect();

        for sort in query.sort.iter().rev() {
            matched.sort_by(|a, b| {
                let ord = a.get(&sort.path).sort_cmp(b.get(&sort.path));
                match sort.dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            });
        }

        let window: Vec<Document> = matched
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        if query.columns.is_empty() {
            Ok(window)
        } else {
            Ok(window.iter().map(|doc| doc.project(&query.columns)).collect())
        }
    }

    fn count(&self, list_key: &str, predicate: &Predicate) -> Result<u64, BackendError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get(list_key)
            .ok_or_else(|| BackendError::new(format!("unknown collection: {list_key}")))?;

        let count = table.iter().filter(|doc| predicate.matches(doc)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn save(&self, list_key: &str, doc: &mut Document) -> Result<(), BackendError> {
        if doc.id().is_none() {
            doc.set_id(self.next_id());
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(list_key.to_string()).or_default();

        let id = doc.get(crate::document::ID_PATH).clone();
        if let Some(existing) = table
            .iter_mut()
            .find(|d| d.get(crate::document::ID_PATH) == &id)
        {
            *existing = doc.clone();
        } else {
            table.push(doc.clone());
        }

        Ok(())
    }
}

///
/// TESTS
///

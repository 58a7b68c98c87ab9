//! Persistence boundary
//!
//! Blueprint operations talk to storage exclusively through [`ModelStore`].
//! The trait is deliberately narrow: the four calls the association pipeline
//! needs, each a potentially blocking I/O operation. Engines signal tolerable
//! conditions through [`StoreErrorKind`] rather than error-shape conventions;
//! in particular a duplicate link insert is `DuplicateKey`, which callers may
//! treat as success.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::record::{FieldMap, Record, RecordId};

mod memory;

pub use memory::MemoryStore;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Classification a store must attach to every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Malformed criteria or payload; the caller's input is at fault
    Usage,
    /// Uniqueness violation, e.g. inserting an already-present link
    DuplicateKey,
    /// Anything else: connectivity, corruption, engine bugs
    Backend,
}

/// Error returned by [`ModelStore`] operations
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Usage, message)
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::DuplicateKey, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Backend, message)
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.kind == StoreErrorKind::DuplicateKey
    }
}

/// Sort direction for populate constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Caller-supplied constraints applied when populating a relation.
///
/// These pass through the pipeline untouched; the store applies them to the
/// populated child sequence on the final fetch.
#[derive(Debug, Clone, Default)]
pub struct PopulateOptions {
    /// Equality filters on child attributes
    pub filter: FieldMap,
    /// Maximum number of children returned
    pub limit: Option<usize>,
    /// Number of children skipped from the front
    pub skip: Option<usize>,
    /// Sort by attribute before limit/skip are applied
    pub sort: Option<(String, SortDirection)>,
}

impl PopulateOptions {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn sort(mut self, attr: &str, direction: SortDirection) -> Self {
        self.sort = Some((attr.to_string(), direction));
        self
    }

    pub fn filter(mut self, attr: &str, value: Value) -> Self {
        self.filter.insert(attr.to_string(), value);
        self
    }
}

/// The persistence operations the association pipeline depends on
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Fetch a record by primary key; `Ok(None)` when absent
    async fn find_one(&self, model: &str, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Persist a new record and return the created entity.
    ///
    /// Implementations must return the full record, not an acknowledgement:
    /// generated identifiers are required downstream.
    async fn create(&self, model: &str, values: FieldMap) -> StoreResult<Record>;

    /// Record the link between a parent and each child on both sides of the
    /// relation. An already-linked pair fails with `DuplicateKey`.
    async fn add_to_collection(
        &self,
        model: &str,
        parent_id: &RecordId,
        alias: &str,
        child_ids: &[RecordId],
    ) -> StoreResult<()>;

    /// Fetch a record with one relation eagerly populated, applying the
    /// caller's populate constraints. The populated attribute holds an
    /// ordered array of child records.
    async fn find_one_populated(
        &self,
        model: &str,
        id: &RecordId,
        alias: &str,
        options: &PopulateOptions,
    ) -> StoreResult<Option<Record>>;
}

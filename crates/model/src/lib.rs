//! # corral-model: model layer for corral
//!
//! Records as JSON object maps, declarative schemas for models and their
//! to-many relations, a registry resolving relation aliases at runtime, and
//! the persistence boundary blueprint operations call through. Ships an
//! in-memory store backend; SQL engines live behind the same trait.

pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod store;

// Re-export core types
pub use error::{ModelError, ModelResult};
pub use record::{fields, FieldMap, Record, RecordId};
pub use registry::ModelRegistry;
pub use schema::{CollectionRelation, ModelSchema, RelationKind};
pub use store::{
    MemoryStore, ModelStore, PopulateOptions, SortDirection, StoreError, StoreErrorKind,
    StoreResult,
};

//! Model registry - runtime access to declared schemas
//!
//! Schemas are registered once at startup; lookups by model name and relation
//! alias are cheap and lock-free on the read path.

use dashmap::DashMap;

use crate::error::{ModelError, ModelResult};
use crate::schema::{CollectionRelation, ModelSchema};

/// Thread-safe registry of model schemas
#[derive(Debug, Default)]
pub struct ModelRegistry {
    schemas: DashMap<String, ModelSchema>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Register a model schema, validating it first
    pub fn register(&self, schema: ModelSchema) -> ModelResult<()> {
        schema.validate()?;
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Get a model's schema by name
    pub fn schema(&self, model: &str) -> ModelResult<ModelSchema> {
        self.schemas
            .get(model)
            .map(|entry| entry.clone())
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))
    }

    /// The primary-key attribute for a model
    pub fn primary_key(&self, model: &str) -> ModelResult<String> {
        Ok(self.schema(model)?.primary_key)
    }

    /// Resolve a to-many relation by alias.
    ///
    /// A missing alias is a configuration error: the mapping is declared at
    /// startup and callers may not invent relation names at runtime.
    pub fn collection(&self, model: &str, alias: &str) -> ModelResult<CollectionRelation> {
        let schema = self.schema(model)?;
        schema.relations.get(alias).cloned().ok_or_else(|| {
            ModelError::Configuration(format!(
                "model '{}' has no to-many relation '{}'",
                model, alias
            ))
        })
    }

    /// Check whether a model is registered
    pub fn has_model(&self, model: &str) -> bool {
        self.schemas.contains_key(model)
    }
}

//! Schema metadata for models and their to-many relations
//!
//! Relations are declared once at startup and resolved by alias at runtime;
//! blueprint operations never reflect over model types per call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ModelError, ModelResult};

/// The shape of a to-many relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// One parent, many children via a back-reference on the child
    HasMany,
    /// Many-to-many via a join representation
    ManyToMany,
}

/// Descriptor for a named to-many relation: the alias as declared on the
/// parent model, the child model it targets, and the child's primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRelation {
    /// Relation name as declared on the parent ("animals")
    pub alias: String,

    /// The child model's registered name ("pet")
    pub target_model: String,

    /// Primary-key attribute on the child model ("pet_id")
    pub target_pk_attr: String,

    /// Kind of relation
    pub kind: RelationKind,

    /// Attribute on the child that points back at the parent, when the
    /// relation is declared from both sides ("children" via "parents")
    pub inverse_attr: Option<String>,
}

impl CollectionRelation {
    pub fn new(alias: &str, target_model: &str) -> Self {
        Self {
            alias: alias.to_string(),
            target_model: target_model.to_string(),
            target_pk_attr: "id".to_string(),
            kind: RelationKind::ManyToMany,
            inverse_attr: None,
        }
    }

    /// Set the child model's primary-key attribute (defaults to `id`)
    pub fn primary_key(mut self, attr: &str) -> Self {
        self.target_pk_attr = attr.to_string();
        self
    }

    /// Set the relation kind
    pub fn kind(mut self, kind: RelationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Declare the inverse attribute on the child model
    pub fn via(mut self, attr: &str) -> Self {
        self.inverse_attr = Some(attr.to_string());
        self
    }

    /// Validate the descriptor for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.alias.is_empty() {
            return Err(ModelError::Configuration(
                "relation alias cannot be empty".to_string(),
            ));
        }
        if self.target_model.is_empty() {
            return Err(ModelError::Configuration(format!(
                "relation '{}' must name a target model",
                self.alias
            )));
        }
        if self.target_pk_attr.is_empty() {
            return Err(ModelError::Configuration(format!(
                "relation '{}' must name the target primary-key attribute",
                self.alias
            )));
        }
        Ok(())
    }
}

/// Declarative schema for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Registered model name ("farm")
    pub name: String,

    /// Primary-key attribute on this model
    pub primary_key: String,

    /// To-many relations by alias
    pub relations: HashMap<String, CollectionRelation>,
}

impl ModelSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary_key: "id".to_string(),
            relations: HashMap::new(),
        }
    }

    /// Set the primary-key attribute (defaults to `id`)
    pub fn primary_key(mut self, attr: &str) -> Self {
        self.primary_key = attr.to_string();
        self
    }

    /// Declare a to-many relation
    pub fn relation(mut self, relation: CollectionRelation) -> Self {
        self.relations.insert(relation.alias.clone(), relation);
        self
    }

    /// Validate the schema and every declared relation
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "model name cannot be empty".to_string(),
            ));
        }
        if self.primary_key.is_empty() {
            return Err(ModelError::Configuration(format!(
                "model '{}' must name a primary-key attribute",
                self.name
            )));
        }
        for relation in self.relations.values() {
            relation.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_builder_chain() {
        let relation = CollectionRelation::new("animals", "pet")
            .primary_key("pet_id")
            .kind(RelationKind::ManyToMany)
            .via("parents");

        assert_eq!(relation.alias, "animals");
        assert_eq!(relation.target_model, "pet");
        assert_eq!(relation.target_pk_attr, "pet_id");
        assert_eq!(relation.kind, RelationKind::ManyToMany);
        assert_eq!(relation.inverse_attr.as_deref(), Some("parents"));
        assert!(relation.validate().is_ok());
    }

    #[test]
    fn test_relation_validation_rejects_blanks() {
        let relation = CollectionRelation::new("animals", "");
        assert!(relation.validate().is_err());

        let relation = CollectionRelation::new("animals", "pet").primary_key("");
        assert!(relation.validate().is_err());
    }

    #[test]
    fn test_schema_builder() {
        let schema = ModelSchema::new("farm")
            .primary_key("farm_id")
            .relation(CollectionRelation::new("animals", "pet").primary_key("pet_id"));

        assert_eq!(schema.name, "farm");
        assert_eq!(schema.primary_key, "farm_id");
        assert!(schema.relations.contains_key("animals"));
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_schema_validation_covers_relations() {
        let schema = ModelSchema::new("farm")
            .relation(CollectionRelation::new("animals", ""));
        assert!(schema.validate().is_err());
    }
}

//! In-memory store backend
//!
//! Keeps every model in a schema-aware table with auto-incrementing integer
//! keys, and links in insertion order with uniqueness enforced per
//! (parent, alias, child) triple. The backend exists for tests and small
//! deployments; it implements the same contract a SQL-backed engine would.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::record::{FieldMap, Record, RecordId};
use crate::registry::ModelRegistry;
use crate::schema::CollectionRelation;
use crate::store::{ModelStore, PopulateOptions, SortDirection, StoreError, StoreResult};

/// Rows of one model, in insertion order
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

/// One recorded association
#[derive(Debug, Clone, PartialEq)]
struct LinkRow {
    model: String,
    parent_id: RecordId,
    alias: String,
    child_id: RecordId,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Table>,
    links: Vec<LinkRow>,
}

/// Schema-aware in-memory [`ModelStore`]
pub struct MemoryStore {
    registry: Arc<ModelRegistry>,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn pk_attr(&self, model: &str) -> StoreResult<String> {
        self.registry
            .primary_key(model)
            .map_err(|err| StoreError::usage(err.to_string()))
    }

    fn relation(&self, model: &str, alias: &str) -> StoreResult<CollectionRelation> {
        self.registry
            .collection(model, alias)
            .map_err(|err| StoreError::usage(err.to_string()))
    }

    fn find_in(table: &Table, pk_attr: &str, id: &RecordId) -> Option<Record> {
        table
            .rows
            .iter()
            .find(|row| row.id(pk_attr).as_ref() == Some(id))
            .cloned()
    }

    /// Insert one link row; `false` when the pair is already linked
    fn insert_link(inner: &mut Inner, row: LinkRow) -> bool {
        if inner.links.contains(&row) {
            return false;
        }
        inner.links.push(row);
        true
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn find_one(&self, model: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        let pk_attr = self.pk_attr(model)?;
        let inner = self.inner.read().await;
        let Some(table) = inner.tables.get(model) else {
            return Ok(None);
        };
        Ok(Self::find_in(table, &pk_attr, id))
    }

    async fn create(&self, model: &str, values: FieldMap) -> StoreResult<Record> {
        let pk_attr = self.pk_attr(model)?;
        let mut inner = self.inner.write().await;
        let table = inner.tables.entry(model.to_string()).or_default();

        let mut record = Record::new(values);
        let id = match record.id(&pk_attr) {
            Some(id) => id,
            None => {
                table.next_id += 1;
                let id = RecordId::Int(table.next_id);
                record.set(&pk_attr, id.to_value());
                id
            }
        };

        if Self::find_in(table, &pk_attr, &id).is_some() {
            return Err(StoreError::duplicate_key(format!(
                "{} record with {} = {} already exists",
                model, pk_attr, id
            )));
        }
        if let Some(explicit) = id.as_i64() {
            table.next_id = table.next_id.max(explicit);
        }

        debug!(model, id = %id, "created record");
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn add_to_collection(
        &self,
        model: &str,
        parent_id: &RecordId,
        alias: &str,
        child_ids: &[RecordId],
    ) -> StoreResult<()> {
        let relation = self.relation(model, alias)?;
        let mut inner = self.inner.write().await;

        for child_id in child_ids {
            let inserted = Self::insert_link(
                &mut inner,
                LinkRow {
                    model: model.to_string(),
                    parent_id: parent_id.clone(),
                    alias: alias.to_string(),
                    child_id: child_id.clone(),
                },
            );
            if !inserted {
                return Err(StoreError::duplicate_key(format!(
                    "{} {} already contains {} {}",
                    model, alias, relation.target_model, child_id
                )));
            }

            // Mirror onto the child's side when the relation is declared
            // from both ends. A pre-existing mirror row is not a conflict.
            if let Some(inverse) = &relation.inverse_attr {
                if self
                    .registry
                    .collection(&relation.target_model, inverse)
                    .is_ok()
                {
                    Self::insert_link(
                        &mut inner,
                        LinkRow {
                            model: relation.target_model.clone(),
                            parent_id: child_id.clone(),
                            alias: inverse.clone(),
                            child_id: parent_id.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn find_one_populated(
        &self,
        model: &str,
        id: &RecordId,
        alias: &str,
        options: &PopulateOptions,
    ) -> StoreResult<Option<Record>> {
        let pk_attr = self.pk_attr(model)?;
        let relation = self.relation(model, alias)?;
        let child_pk = &relation.target_pk_attr;

        let inner = self.inner.read().await;
        let Some(parent) = inner
            .tables
            .get(model)
            .and_then(|table| Self::find_in(table, &pk_attr, id))
        else {
            return Ok(None);
        };

        let child_table = inner.tables.get(&relation.target_model);
        let mut children: Vec<Record> = inner
            .links
            .iter()
            .filter(|link| link.model == model && link.parent_id == *id && link.alias == alias)
            .filter_map(|link| {
                child_table.and_then(|table| Self::find_in(table, child_pk, &link.child_id))
            })
            .filter(|child| {
                options
                    .filter
                    .iter()
                    .all(|(attr, expected)| child.get(attr) == Some(expected))
            })
            .collect();

        if let Some((attr, direction)) = &options.sort {
            children.sort_by(|a, b| {
                let ordering = compare_values(a.get(attr), b.get(attr));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(skip) = options.skip {
            children = children.into_iter().skip(skip).collect();
        }
        if let Some(limit) = options.limit {
            children.truncate(limit);
        }

        let mut populated = parent;
        populated.set(
            alias,
            Value::Array(children.into_iter().map(|c| Value::Object(c.into_fields())).collect()),
        );
        Ok(Some(populated))
    }
}

/// Total order over the value shapes identifiers and plain attributes use.
/// Numbers sort before strings; missing attributes sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(_), _) => Ordering::Less,
            (_, Value::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        },
    }
}

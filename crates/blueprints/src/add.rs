//! Add-to-collection pipeline
//!
//! Associate one record with the to-many relation of another, the way a
//! convention-driven `add` endpoint behaves: if the child is named by primary
//! key it is linked, creating it first when it does not exist; if it is named
//! by field values it is created and then linked. The association is
//! bidirectional either way, observers are notified exactly once, and a
//! repeated add of the same pair succeeds silently.
//!
//! Step order: resolve the relation and the child specification (both fail
//! before any persistence call), join the parent lookup with the
//! child-existence probe, create the child if needed, link, notify, re-fetch
//! the parent with the relation populated.

use std::slice;
use std::sync::Arc;
use tracing::{debug, info, warn};

use corral_model::{
    CollectionRelation, FieldMap, ModelRegistry, ModelStore, Record, RecordId,
};
use corral_realtime::{RecordBroadcast, ReverseRef};

use crate::error::{BlueprintError, BlueprintResult};
use crate::request::{AddRequest, ChildSpec};

/// Transient outcome of the child-resolution and link steps; drives the
/// notification decisions and nothing else
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub parent_id: RecordId,
    pub child_id: RecordId,
    pub was_created: bool,
    pub was_duplicate: bool,
}

/// The add-to-collection operation, wired to a schema registry, a store, and
/// an optional broadcaster
pub struct AddToCollection {
    registry: Arc<ModelRegistry>,
    store: Arc<dyn ModelStore>,
    realtime: Option<Arc<dyn RecordBroadcast>>,
}

impl AddToCollection {
    pub fn new(registry: Arc<ModelRegistry>, store: Arc<dyn ModelStore>) -> Self {
        Self {
            registry,
            store,
            realtime: None,
        }
    }

    /// Attach a broadcaster; without one, every announcement is skipped
    pub fn with_realtime(mut self, realtime: Arc<dyn RecordBroadcast>) -> Self {
        self.realtime = Some(realtime);
        self
    }

    /// Run one invocation and return the parent with the relation populated
    pub async fn run(&self, req: &AddRequest) -> BlueprintResult<Record> {
        let relation = self.registry.collection(&req.model, &req.alias)?;
        let spec = req.child_spec()?;
        debug!(
            model = %req.model,
            alias = %req.alias,
            parent = %req.parent_id,
            "running add-to-collection"
        );

        // Parent lookup and the child-existence probe are pure reads with no
        // data dependency; run them together and join before any write.
        let parent_lookup = async {
            self.store
                .find_one(&req.model, &req.parent_id)
                .await
                .map_err(BlueprintError::from)?
                .ok_or_else(|| BlueprintError::ParentNotFound {
                    model: req.model.clone(),
                    id: req.parent_id.clone(),
                })
        };
        let child_probe = async {
            match &spec {
                ChildSpec::ById(id) => self
                    .store
                    .find_one(&relation.target_model, id)
                    .await
                    .map_err(BlueprintError::from),
                ChildSpec::ByFields(_) => Ok(None),
            }
        };
        let (_parent, probe) = tokio::try_join!(parent_lookup, child_probe)?;

        let (child_id, was_created) = match spec {
            ChildSpec::ById(id) => match probe {
                Some(existing) => {
                    let stored = existing.id(&relation.target_pk_attr).unwrap_or(id);
                    (stored, false)
                }
                // Referenced but absent: create a record carrying that key.
                None => {
                    let mut payload = FieldMap::new();
                    payload.insert(relation.target_pk_attr.clone(), id.to_value());
                    (self.create_child(&relation, payload, req).await?, true)
                }
            },
            ChildSpec::ByFields(fields) => {
                (self.create_child(&relation, fields, req).await?, true)
            }
        };

        let was_duplicate = match self
            .store
            .add_to_collection(
                &req.model,
                &req.parent_id,
                &req.alias,
                slice::from_ref(&child_id),
            )
            .await
        {
            Ok(()) => false,
            Err(err) if err.is_duplicate_key() => {
                warn!(
                    model = %req.model,
                    alias = %req.alias,
                    parent = %req.parent_id,
                    child = %child_id,
                    "pair already linked; treating add as a no-op"
                );
                true
            }
            Err(err) => return Err(err.into()),
        };

        let outcome = LinkOutcome {
            parent_id: req.parent_id.clone(),
            child_id,
            was_created,
            was_duplicate,
        };
        self.notify(req, &relation, &outcome).await;

        self.materialize(req).await
    }

    /// Persist a new child and announce its creation
    async fn create_child(
        &self,
        relation: &CollectionRelation,
        payload: FieldMap,
        req: &AddRequest,
    ) -> BlueprintResult<RecordId> {
        let record = self.store.create(&relation.target_model, payload).await?;
        let child_id = record.id(&relation.target_pk_attr).ok_or_else(|| {
            BlueprintError::Infrastructure(format!(
                "store returned a '{}' record without its primary key '{}'",
                relation.target_model, relation.target_pk_attr
            ))
        })?;
        info!(model = %relation.target_model, id = %child_id, "created child record");

        if let Some(realtime) = &self.realtime {
            if let Some(conn) = req.socket {
                realtime
                    .subscribe(conn, &relation.target_model, slice::from_ref(&child_id))
                    .await;
                realtime.introduce(&relation.target_model, &child_id).await;
            }
            realtime
                .publish_create(&relation.target_model, &record, req.excluded())
                .await;
        }
        Ok(child_id)
    }

    /// Decide what to announce about the link.
    ///
    /// Nothing is announced for a duplicate add: observers saw the pair when
    /// it was first linked. The reverse notification is suppressed when this
    /// call also created the child, because the creation announcement already
    /// informed the child's observers.
    async fn notify(&self, req: &AddRequest, relation: &CollectionRelation, outcome: &LinkOutcome) {
        if outcome.was_duplicate {
            return;
        }
        let Some(realtime) = &self.realtime else {
            return;
        };

        if let Some(conn) = req.socket {
            realtime
                .subscribe(conn, &req.model, slice::from_ref(&outcome.parent_id))
                .await;
        }

        let reverse = if outcome.was_created {
            None
        } else {
            relation.inverse_attr.as_ref().map(|attr| ReverseRef {
                model: relation.target_model.clone(),
                attribute: attr.clone(),
                id: outcome.child_id.clone(),
            })
        };
        realtime
            .publish_add(
                &req.model,
                &outcome.parent_id,
                &req.alias,
                &outcome.child_id,
                reverse,
                req.excluded(),
            )
            .await;
    }

    /// Re-fetch the parent with the relation populated; missing data at this
    /// point means the store lost a record mid-operation
    async fn materialize(&self, req: &AddRequest) -> BlueprintResult<Record> {
        let populated = self
            .store
            .find_one_populated(&req.model, &req.parent_id, &req.alias, &req.populate)
            .await?
            .ok_or_else(|| {
                BlueprintError::Infrastructure(format!(
                    "'{}' record {} vanished after linking",
                    req.model, req.parent_id
                ))
            })?;

        if populated.get(&req.alias).is_none() {
            return Err(BlueprintError::Infrastructure(format!(
                "populated fetch of '{}' {} is missing the '{}' relation",
                req.model, req.parent_id, req.alias
            )));
        }
        Ok(populated)
    }
}

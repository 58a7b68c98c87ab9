//! # corral-realtime: record event broadcasting for corral
//!
//! Keeps track of which connections observe which records and delivers
//! creation and association events to them. The socket transport itself is an
//! external collaborator; this crate stops at the room/mailbox boundary.
//!
//! Blueprint operations announce through the [`RecordBroadcast`] trait;
//! [`RealtimeHub`] is the in-process implementation. Deployments without a
//! realtime layer simply run without a broadcaster.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use corral_model::{Record, RecordId};

pub mod hub;

pub use hub::RealtimeHub;

/// Unique identifier for an observing connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events delivered to observing connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "camelCase")]
pub enum RecordEvent {
    /// A record came into existence
    Created { model: String, record: Record },
    /// A record gained a member in one of its to-many relations
    AddedTo {
        model: String,
        id: RecordId,
        attribute: String,
        added_id: RecordId,
    },
}

/// The child-side notification of a link announcement.
///
/// Present when the relation is declared from both ends and the child's own
/// observers should hear about the new association; absent when the child was
/// just created (its creation announcement already informed them) or the
/// relation has no inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseRef {
    /// The child model
    pub model: String,
    /// The inverse attribute on the child
    pub attribute: String,
    /// The child record's identifier
    pub id: RecordId,
}

/// Broadcast operations the association pipeline calls.
///
/// All delivery is best-effort; a vanished connection is dropped, never an
/// error the pipeline has to handle.
#[async_trait]
pub trait RecordBroadcast: Send + Sync {
    /// Join a connection to the given records' rooms
    async fn subscribe(&self, conn: ConnectionId, model: &str, ids: &[RecordId]);

    /// Make a freshly created record addressable in the subscription index
    async fn introduce(&self, model: &str, id: &RecordId);

    /// Announce a record's creation to the model's watchers
    async fn publish_create(&self, model: &str, record: &Record, exclude: Option<ConnectionId>);

    /// Announce that `child_id` was added to `parent_id`'s relation
    /// `attribute`; `reverse` carries the child-side notification, if any
    async fn publish_add(
        &self,
        model: &str,
        parent_id: &RecordId,
        attribute: &str,
        child_id: &RecordId,
        reverse: Option<ReverseRef>,
        exclude: Option<ConnectionId>,
    );
}

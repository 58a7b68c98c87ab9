//! In-process broadcast hub
//!
//! Rooms are named `model` (watchers of the whole model) or `model:id`
//! (observers of one record). Each registered connection owns an unbounded
//! mailbox; delivery clones the event into every member mailbox except the
//! excluded one.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use corral_model::{Record, RecordId};

use crate::{ConnectionId, RecordBroadcast, RecordEvent, ReverseRef};

fn record_room(model: &str, id: &RecordId) -> String {
    format!("{}:{}", model, id)
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, HashSet<ConnectionId>>,
    mailboxes: HashMap<ConnectionId, mpsc::UnboundedSender<RecordEvent>>,
}

/// Room registry and mailbox delivery for [`RecordEvent`]s
#[derive(Default)]
pub struct RealtimeHub {
    state: RwLock<HubState>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back its event mailbox
    pub async fn register(&self, conn: ConnectionId) -> mpsc::UnboundedReceiver<RecordEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.write().await;
        state.mailboxes.insert(conn, tx);
        info!(%conn, "connection registered");
        rx
    }

    /// Drop a connection and leave all of its rooms
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.state.write().await;
        state.mailboxes.remove(&conn);
        for members in state.rooms.values_mut() {
            members.remove(&conn);
        }
        info!(%conn, "connection disconnected");
    }

    /// Join the model-level room, receiving creation announcements
    pub async fn watch(&self, conn: ConnectionId, model: &str) {
        let mut state = self.state.write().await;
        state.rooms.entry(model.to_string()).or_default().insert(conn);
        debug!(%conn, model, "watching model");
    }

    async fn deliver(&self, room: &str, event: RecordEvent, exclude: Option<ConnectionId>) {
        let state = self.state.read().await;
        let Some(members) = state.rooms.get(room) else {
            return;
        };
        for conn in members {
            if Some(*conn) == exclude {
                continue;
            }
            if let Some(mailbox) = state.mailboxes.get(conn) {
                // A closed mailbox means the connection is gone; skip it and
                // let disconnect() reap the membership.
                let _ = mailbox.send(event.clone());
            }
        }
    }

    #[cfg(test)]
    async fn room_size(&self, room: &str) -> usize {
        self.state
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }
}

#[async_trait]
impl RecordBroadcast for RealtimeHub {
    async fn subscribe(&self, conn: ConnectionId, model: &str, ids: &[RecordId]) {
        let mut state = self.state.write().await;
        for id in ids {
            state
                .rooms
                .entry(record_room(model, id))
                .or_default()
                .insert(conn);
        }
        debug!(%conn, model, count = ids.len(), "subscribed to records");
    }

    async fn introduce(&self, model: &str, id: &RecordId) {
        let mut state = self.state.write().await;
        state.rooms.entry(record_room(model, id)).or_default();
        debug!(model, %id, "record introduced");
    }

    async fn publish_create(&self, model: &str, record: &Record, exclude: Option<ConnectionId>) {
        info!(model, "publishing create");
        self.deliver(
            model,
            RecordEvent::Created {
                model: model.to_string(),
                record: record.clone(),
            },
            exclude,
        )
        .await;
    }

    async fn publish_add(
        &self,
        model: &str,
        parent_id: &RecordId,
        attribute: &str,
        child_id: &RecordId,
        reverse: Option<ReverseRef>,
        exclude: Option<ConnectionId>,
    ) {
        info!(model, %parent_id, attribute, %child_id, "publishing add");
        self.deliver(
            &record_room(model, parent_id),
            RecordEvent::AddedTo {
                model: model.to_string(),
                id: parent_id.clone(),
                attribute: attribute.to_string(),
                added_id: child_id.clone(),
            },
            exclude,
        )
        .await;

        if let Some(rev) = reverse {
            self.deliver(
                &record_room(&rev.model, &rev.id),
                RecordEvent::AddedTo {
                    model: rev.model.clone(),
                    id: rev.id.clone(),
                    attribute: rev.attribute.clone(),
                    added_id: parent_id.clone(),
                },
                exclude,
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_model::fields;
    use serde_json::json;

    fn drain(rx: &mut mpsc::UnboundedReceiver<RecordEvent>) -> Vec<RecordEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_watchers_receive_create_events() {
        let hub = RealtimeHub::new();
        let conn = ConnectionId::new();
        let mut rx = hub.register(conn).await;
        hub.watch(conn, "pet").await;

        let record = Record::new(fields(&[("pet_id", json!(1)), ("name", json!("Jimmy"))]));
        hub.publish_create("pet", &record, None).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            RecordEvent::Created {
                model: "pet".to_string(),
                record,
            }
        );
    }

    #[tokio::test]
    async fn test_excluded_connection_is_skipped() {
        let hub = RealtimeHub::new();
        let requester = ConnectionId::new();
        let observer = ConnectionId::new();
        let mut requester_rx = hub.register(requester).await;
        let mut observer_rx = hub.register(observer).await;
        hub.watch(requester, "pet").await;
        hub.watch(observer, "pet").await;

        let record = Record::new(fields(&[("pet_id", json!(1))]));
        hub.publish_create("pet", &record, Some(requester)).await;

        assert!(drain(&mut requester_rx).is_empty());
        assert_eq!(drain(&mut observer_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_publish_add_reaches_record_room_and_reverse() {
        let hub = RealtimeHub::new();
        let farm_watcher = ConnectionId::new();
        let pet_watcher = ConnectionId::new();
        let mut farm_rx = hub.register(farm_watcher).await;
        let mut pet_rx = hub.register(pet_watcher).await;
        hub.subscribe(farm_watcher, "farm", &[RecordId::Int(1)]).await;
        hub.subscribe(pet_watcher, "pet", &[RecordId::Int(5)]).await;

        hub.publish_add(
            "farm",
            &RecordId::Int(1),
            "animals",
            &RecordId::Int(5),
            Some(ReverseRef {
                model: "pet".to_string(),
                attribute: "parents".to_string(),
                id: RecordId::Int(5),
            }),
            None,
        )
        .await;

        let farm_events = drain(&mut farm_rx);
        assert_eq!(
            farm_events,
            vec![RecordEvent::AddedTo {
                model: "farm".to_string(),
                id: RecordId::Int(1),
                attribute: "animals".to_string(),
                added_id: RecordId::Int(5),
            }]
        );

        let pet_events = drain(&mut pet_rx);
        assert_eq!(
            pet_events,
            vec![RecordEvent::AddedTo {
                model: "pet".to_string(),
                id: RecordId::Int(5),
                attribute: "parents".to_string(),
                added_id: RecordId::Int(1),
            }]
        );
    }

    #[tokio::test]
    async fn test_publish_add_without_reverse_stays_on_parent_side() {
        let hub = RealtimeHub::new();
        let pet_watcher = ConnectionId::new();
        let mut pet_rx = hub.register(pet_watcher).await;
        hub.subscribe(pet_watcher, "pet", &[RecordId::Int(5)]).await;

        hub.publish_add(
            "farm",
            &RecordId::Int(1),
            "animals",
            &RecordId::Int(5),
            None,
            None,
        )
        .await;

        assert!(drain(&mut pet_rx).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_rooms() {
        let hub = RealtimeHub::new();
        let conn = ConnectionId::new();
        let _rx = hub.register(conn).await;
        hub.subscribe(conn, "farm", &[RecordId::Int(1)]).await;
        assert_eq!(hub.room_size("farm:1").await, 1);

        hub.disconnect(conn).await;
        assert_eq!(hub.room_size("farm:1").await, 0);
    }
}

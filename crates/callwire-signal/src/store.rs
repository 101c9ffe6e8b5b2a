//! The persistent call store seen by the signaling core.
//!
//! [`CallStore`] is the narrow async interface the components depend on.
//! [`LocalCallStore`] implements it over a SQLite [`Database`] and publishes a
//! change event on the [`NotificationBus`] after every successful write, the
//! way a hosted database's change feed would:
//!
//! | write            | topic(s)                                  | kind   |
//! |------------------|-------------------------------------------|--------|
//! | insert call      | `calls:<receiver>`                        | insert |
//! | update call      | `calls:<caller>`, `calls:<receiver>`      | update |
//! | insert offer     | `offers:<call>`                           | insert |
//! | insert candidate | `ice_candidates:<connection>`             | insert |

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use callwire_bus::{BusEvent, NotificationBus};
use callwire_shared::{ChangeKind, SdpType, Topic};
use callwire_store::{
    Call, CallHistoryEntry, Connection, ConnectionUpdate, Database, IceCandidate, Offer,
    QualitySample, QualitySummary, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Insert/update/query access to call records.
///
/// Lookups that expect a single row fail with `StoreError::NotFound` when no
/// row matches; every other failure is a distinct error.
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn insert_call(&self, call: &Call) -> Result<Call>;
    async fn update_call(&self, call: &Call) -> Result<Call>;
    async fn get_call(&self, id: Uuid) -> Result<Call>;
    async fn latest_active_call(&self, match_id: Uuid) -> Result<Call>;
    async fn terminal_calls_for_user(&self, user_id: Uuid) -> Result<Vec<Call>>;
    async fn call_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<CallHistoryEntry>>;

    async fn insert_connection(&self, connection: &Connection) -> Result<Connection>;
    async fn update_connection(
        &self,
        id: Uuid,
        update: &ConnectionUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Connection>;
    async fn latest_connection_for_call(&self, call_id: Uuid) -> Result<Connection>;
    async fn connection_for_user(&self, call_id: Uuid, user_id: Uuid) -> Result<Connection>;
    async fn connections_for_call(&self, call_id: Uuid) -> Result<Vec<Connection>>;

    async fn insert_offer(&self, offer: &Offer) -> Result<Offer>;
    async fn latest_offer(&self, call_id: Uuid, sdp_type: SdpType) -> Result<Offer>;

    async fn insert_ice_candidate(&self, candidate: &IceCandidate) -> Result<IceCandidate>;
    async fn ice_candidates_for_connection(&self, connection_id: Uuid)
        -> Result<Vec<IceCandidate>>;

    async fn insert_quality_sample(&self, sample: &QualitySample) -> Result<()>;
    async fn quality_summary(&self, call_id: Uuid) -> Result<QualitySummary>;
}

/// SQLite-backed store that feeds the notification bus.
pub struct LocalCallStore {
    db: Mutex<Database>,
    bus: Arc<dyn NotificationBus>,
}

impl LocalCallStore {
    pub fn new(db: Database, bus: Arc<dyn NotificationBus>) -> Self {
        Self {
            db: Mutex::new(db),
            bus,
        }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish<T: Serialize>(&self, topic: Topic, kind: ChangeKind, row: &T) {
        match BusEvent::new(topic, kind, row) {
            Ok(event) => {
                self.bus.publish(event);
            }
            Err(e) => warn!(error = %e, "Failed to encode change event"),
        }
    }
}

#[async_trait]
impl CallStore for LocalCallStore {
    async fn insert_call(&self, call: &Call) -> Result<Call> {
        let row = self.db().insert_call(call)?;
        self.publish(Topic::calls(row.receiver_id), ChangeKind::Insert, &row);
        Ok(row)
    }

    async fn update_call(&self, call: &Call) -> Result<Call> {
        let row = self.db().update_call(call)?;
        self.publish(Topic::calls(row.caller_id), ChangeKind::Update, &row);
        if row.receiver_id != row.caller_id {
            self.publish(Topic::calls(row.receiver_id), ChangeKind::Update, &row);
        }
        Ok(row)
    }

    async fn get_call(&self, id: Uuid) -> Result<Call> {
        self.db().get_call(id)
    }

    async fn latest_active_call(&self, match_id: Uuid) -> Result<Call> {
        self.db().latest_active_call(match_id)
    }

    async fn terminal_calls_for_user(&self, user_id: Uuid) -> Result<Vec<Call>> {
        self.db().terminal_calls_for_user(user_id)
    }

    async fn call_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<CallHistoryEntry>> {
        self.db().call_history(user_id, limit)
    }

    async fn insert_connection(&self, connection: &Connection) -> Result<Connection> {
        self.db().insert_connection(connection)
    }

    async fn update_connection(
        &self,
        id: Uuid,
        update: &ConnectionUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Connection> {
        self.db().update_connection(id, update, updated_at)
    }

    async fn latest_connection_for_call(&self, call_id: Uuid) -> Result<Connection> {
        self.db().latest_connection_for_call(call_id)
    }

    async fn connection_for_user(&self, call_id: Uuid, user_id: Uuid) -> Result<Connection> {
        self.db().connection_for_user(call_id, user_id)
    }

    async fn connections_for_call(&self, call_id: Uuid) -> Result<Vec<Connection>> {
        self.db().connections_for_call(call_id)
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<Offer> {
        let row = self.db().insert_offer(offer)?;
        self.publish(Topic::offers(row.call_id), ChangeKind::Insert, &row);
        Ok(row)
    }

    async fn latest_offer(&self, call_id: Uuid, sdp_type: SdpType) -> Result<Offer> {
        self.db().latest_offer(call_id, sdp_type)
    }

    async fn insert_ice_candidate(&self, candidate: &IceCandidate) -> Result<IceCandidate> {
        let row = self.db().insert_ice_candidate(candidate)?;
        self.publish(
            Topic::ice_candidates(row.connection_id),
            ChangeKind::Insert,
            &row,
        );
        Ok(row)
    }

    async fn ice_candidates_for_connection(
        &self,
        connection_id: Uuid,
    ) -> Result<Vec<IceCandidate>> {
        self.db().ice_candidates_for_connection(connection_id)
    }

    async fn insert_quality_sample(&self, sample: &QualitySample) -> Result<()> {
        self.db().insert_quality_sample(sample)
    }

    async fn quality_summary(&self, call_id: Uuid) -> Result<QualitySummary> {
        self.db().quality_summary(call_id)
    }
}

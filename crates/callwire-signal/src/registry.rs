//! Per-call connection registry with a read-through cache.

use std::sync::Arc;

use callwire_shared::Clock;
use callwire_store::{Connection, ConnectionUpdate, OptionalExt};
use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CallError, Result};
use crate::store::CallStore;

/// Registers each participant's signaling endpoint and remembers the most
/// recently touched connection per call.
///
/// The cache is keyed by call id and bounded by entry count. It is refreshed
/// on every create and update, so it reflects the latest local write; writes
/// made by another process are only seen after the entry is evicted.
pub struct ConnectionRegistry {
    store: Arc<dyn CallStore>,
    clock: Arc<dyn Clock>,
    cache: Cache<Uuid, Connection>,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn CallStore>, clock: Arc<dyn Clock>, cache_capacity: usize) -> Self {
        let cache = Cache::<Uuid, Connection>::builder()
            .max_capacity(cache_capacity.max(1) as u64)
            .eviction_listener(|call_id, _, cause| {
                if cause.was_evicted() {
                    debug!(call = %call_id, ?cause, "Evicted cached connection");
                }
            })
            .build();

        Self {
            store,
            clock,
            cache,
        }
    }

    /// Register a participant's endpoint for a call.
    ///
    /// Only the call's caller and receiver may register, once each.
    pub async fn create_connection(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        peer_connection_id: &str,
    ) -> Result<Connection> {
        let call = self.store.get_call(call_id).await.map_err(|e| {
            if e.is_not_found() {
                CallError::NotFound {
                    entity: "call",
                    id: call_id,
                }
            } else {
                CallError::store("create connection")(e)
            }
        })?;
        if user_id != call.caller_id && user_id != call.receiver_id {
            return Err(CallError::NotParticipant { call_id, user_id });
        }

        let connection = Connection {
            id: Uuid::new_v4(),
            call_id,
            user_id,
            peer_connection_id: peer_connection_id.to_string(),
            is_connected: false,
            updated_at: self.clock.now(),
        };

        let connection = self
            .store
            .insert_connection(&connection)
            .await
            .map_err(CallError::store("create connection"))?;

        self.remember(&connection).await;
        info!(
            connection = %connection.id,
            call = %call_id,
            user = %user_id,
            "Connection registered"
        );
        Ok(connection)
    }

    /// Apply a partial update. Fields left `None` keep their stored value.
    pub async fn update_connection(
        &self,
        connection_id: Uuid,
        update: ConnectionUpdate,
    ) -> Result<Connection> {
        let connection = self
            .store
            .update_connection(connection_id, &update, self.clock.now())
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CallError::NotFound {
                        entity: "connection",
                        id: connection_id,
                    }
                } else {
                    CallError::store("update connection")(e)
                }
            })?;

        self.remember(&connection).await;
        debug!(
            connection = %connection.id,
            is_connected = connection.is_connected,
            "Connection updated"
        );
        Ok(connection)
    }

    /// The most recently updated connection of a call, served from cache when
    /// present.
    pub async fn get_connection(&self, call_id: Uuid) -> Result<Option<Connection>> {
        if let Some(hit) = self.cache.get(&call_id).await {
            return Ok(Some(hit));
        }

        let found = self
            .store
            .latest_connection_for_call(call_id)
            .await
            .optional()
            .map_err(CallError::store("get connection"))?;

        if let Some(connection) = &found {
            self.remember(connection).await;
        }
        Ok(found)
    }

    /// The connection a specific participant registered for a call.
    /// Always read from the store.
    pub async fn get_connection_for_user(
        &self,
        call_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Connection>> {
        self.store
            .connection_for_user(call_id, user_id)
            .await
            .optional()
            .map_err(CallError::store("get connection for user"))
    }

    pub async fn connections_for_call(&self, call_id: Uuid) -> Result<Vec<Connection>> {
        self.store
            .connections_for_call(call_id)
            .await
            .map_err(CallError::store("list connections"))
    }

    /// Drop the cached entry of a finished call.
    pub async fn evict(&self, call_id: Uuid) -> bool {
        self.cache.remove(&call_id).await.is_some()
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count() as usize
    }

    async fn remember(&self, connection: &Connection) {
        self.cache
            .insert(connection.call_id, connection.clone())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testutil::Harness;

    fn registry(h: &Harness, capacity: usize) -> ConnectionRegistry {
        ConnectionRegistry::new(h.store.clone(), h.clock.clone(), capacity)
    }

    #[tokio::test]
    async fn test_create_starts_disconnected() {
        let h = Harness::new();
        let call = h.call().await;
        let registry = registry(&h, 8);

        let conn = registry
            .create_connection(call.id, call.caller_id, "pc-1")
            .await
            .unwrap();
        assert!(!conn.is_connected);
        assert_eq!(conn.peer_connection_id, "pc-1");
        assert_eq!(registry.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_create_for_unknown_call_fails() {
        let h = Harness::new();
        let err = registry(&h, 8)
            .create_connection(Uuid::new_v4(), Uuid::new_v4(), "pc")
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::NotFound { entity: "call", .. }));
    }

    #[tokio::test]
    async fn test_stranger_cannot_register() {
        let h = Harness::new();
        let call = h.call().await;
        let registry = registry(&h, 8);
        let stranger = Uuid::new_v4();

        let err = registry
            .create_connection(call.id, stranger, "pc-x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::NotParticipant { call_id, user_id } if call_id == call.id && user_id == stranger
        ));
        assert!(registry.connections_for_call(call.id).await.unwrap().is_empty());
        assert_eq!(registry.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_participant_registers_once() {
        let h = Harness::new();
        let call = h.call().await;
        let registry = registry(&h, 8);
        let first = registry
            .create_connection(call.id, call.receiver_id, "pc-1")
            .await
            .unwrap();

        let err = registry
            .create_connection(call.id, call.receiver_id, "pc-2")
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Store { .. }));

        let stored = registry.connections_for_call(call.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, first.id);
        assert_eq!(registry.get_connection(call.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let h = Harness::new();
        let call = h.call().await;
        let registry = registry(&h, 8);
        let conn = registry
            .create_connection(call.id, call.caller_id, "pc-1")
            .await
            .unwrap();

        h.clock.advance(Duration::seconds(2));
        let updated = registry
            .update_connection(
                conn.id,
                ConnectionUpdate {
                    is_connected: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.is_connected);
        assert_eq!(updated.peer_connection_id, "pc-1");
        assert!(updated.updated_at > conn.updated_at);

        let cached = registry.get_connection(call.id).await.unwrap().unwrap();
        assert!(cached.is_connected);
    }

    #[tokio::test]
    async fn test_update_unknown_connection_is_not_found() {
        let h = Harness::new();
        let err = registry(&h, 8)
            .update_connection(Uuid::new_v4(), ConnectionUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::NotFound { entity: "connection", .. }));
    }

    #[tokio::test]
    async fn test_get_connection_reads_through() {
        let h = Harness::new();
        let call = h.call().await;
        let writer = registry(&h, 8);
        let conn = writer
            .create_connection(call.id, call.receiver_id, "pc-r")
            .await
            .unwrap();

        // A second registry shares the store but not the cache.
        let reader = registry(&h, 8);
        assert_eq!(reader.cached_len().await, 0);
        assert_eq!(reader.get_connection(call.id).await.unwrap(), Some(conn));
        assert_eq!(reader.cached_len().await, 1);

        assert!(reader.get_connection(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_for_each_participant() {
        let h = Harness::new();
        let call = h.call().await;
        let registry = registry(&h, 8);
        let a = registry
            .create_connection(call.id, call.caller_id, "pc-a")
            .await
            .unwrap();
        let b = registry
            .create_connection(call.id, call.receiver_id, "pc-b")
            .await
            .unwrap();

        let got_a = registry
            .get_connection_for_user(call.id, call.caller_id)
            .await
            .unwrap();
        assert_eq!(got_a.map(|c| c.id), Some(a.id));
        assert_eq!(registry.connections_for_call(call.id).await.unwrap().len(), 2);

        // Most recent write wins for the per-call lookup.
        assert_eq!(registry.get_connection(call.id).await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let h = Harness::new();
        let registry = registry(&h, 2);

        let mut calls = Vec::new();
        for _ in 0..5 {
            let call = h.call().await;
            registry
                .create_connection(call.id, call.caller_id, "pc")
                .await
                .unwrap();
            calls.push(call);
        }
        assert!(registry.cached_len().await <= 2);

        // Whatever was dropped is still served from the store.
        for call in &calls {
            assert!(registry.get_connection(call.id).await.unwrap().is_some());
        }
        assert!(registry.cached_len().await <= 2);
    }

    #[tokio::test]
    async fn test_evict_and_clear() {
        let h = Harness::new();
        let registry = registry(&h, 8);
        let (first, second) = (h.call().await, h.call().await);
        for call in [&first, &second] {
            registry
                .create_connection(call.id, call.caller_id, "pc")
                .await
                .unwrap();
        }
        assert_eq!(registry.cached_len().await, 2);

        assert!(registry.evict(first.id).await);
        assert!(!registry.evict(first.id).await);
        assert_eq!(registry.cached_len().await, 1);

        registry.clear().await;
        assert_eq!(registry.cached_len().await, 0);
        assert!(registry.get_connection(first.id).await.unwrap().is_some());
    }
}

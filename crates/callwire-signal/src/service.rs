//! Wiring of the signaling components for one participant.

use std::sync::Arc;

use callwire_bus::{LocalBus, NotificationBus};
use callwire_shared::{CallStatus, Clock, SystemClock};
use callwire_store::{Call, Database};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SignalConfig;
use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::quality::QualityAggregator;
use crate::registry::ConnectionRegistry;
use crate::router::SubscriptionRouter;
use crate::session::CallSessionManager;
use crate::signaling::SignalingRelay;
use crate::store::{CallStore, LocalCallStore};

/// Every component a participant needs, sharing one store, bus, identity
/// and clock.
pub struct CallService {
    config: SignalConfig,
    sessions: CallSessionManager,
    registry: ConnectionRegistry,
    relay: SignalingRelay,
    router: SubscriptionRouter,
    quality: QualityAggregator,
}

impl CallService {
    pub fn init(
        config: SignalConfig,
        store: Arc<dyn CallStore>,
        bus: Arc<dyn NotificationBus>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = CallSessionManager::new(
            store.clone(),
            identity,
            clock.clone(),
            config.history_limit,
        );
        let registry = ConnectionRegistry::new(store.clone(), clock.clone(), config.cache_capacity);
        let relay = SignalingRelay::new(store.clone(), clock);
        let router = SubscriptionRouter::new(bus);
        let quality = QualityAggregator::new(store);

        info!(
            cache_capacity = config.cache_capacity,
            history_limit = config.history_limit,
            "Call service initialised"
        );

        Self {
            config,
            sessions,
            registry,
            relay,
            router,
            quality,
        }
    }

    /// Build a self-contained service over a SQLite file and an in-process
    /// bus, using the system clock.
    pub fn open_local(
        config: SignalConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> anyhow::Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        let bus: Arc<dyn NotificationBus> = Arc::new(LocalBus::new());
        let store: Arc<dyn CallStore> = Arc::new(LocalCallStore::new(db, bus.clone()));

        Ok(Self::init(config, store, bus, identity, Arc::new(SystemClock)))
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn sessions(&self) -> &CallSessionManager {
        &self.sessions
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn relay(&self) -> &SignalingRelay {
        &self.relay
    }

    pub fn router(&self) -> &SubscriptionRouter {
        &self.router
    }

    pub fn quality(&self) -> &QualityAggregator {
        &self.quality
    }

    /// Mark an outgoing call missed if nobody answers within the configured
    /// ring timeout.
    pub fn watch_ring_timeout(&self, call_id: Uuid) -> JoinHandle<()> {
        self.sessions.watch_ring_timeout(call_id, self.config.ring_timeout)
    }

    /// Move a call to a final status and release the local resources tied
    /// to it.
    pub async fn end_call(&self, call_id: Uuid, status: CallStatus) -> Result<Call> {
        let call = self.sessions.update_call_status(call_id, status).await?;
        if call.status.is_terminal() {
            self.teardown_call(call_id).await;
        }
        Ok(call)
    }

    /// Close the call's offer and candidate subscriptions and drop its cached
    /// connection. The per-user call subscription stays open.
    pub async fn teardown_call(&self, call_id: Uuid) {
        self.router.unsubscribe_from_offers(call_id);

        match self.registry.connections_for_call(call_id).await {
            Ok(connections) => {
                for connection in connections {
                    self.router.unsubscribe_from_ice_candidates(connection.id);
                }
            }
            Err(e) => warn!(call = %call_id, error = %e, "Could not list connections for teardown"),
        }

        self.registry.evict(call_id).await;
        info!(call = %call_id, "Call torn down");
    }

    pub async fn shutdown(&self) {
        self.router.cleanup();
        self.registry.clear().await;
        info!("Call service shut down");
    }
}

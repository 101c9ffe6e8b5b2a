//! Shared fixtures for unit tests.

use std::sync::Arc;

use callwire_bus::LocalBus;
use callwire_shared::{CallStatus, CallType, Clock, ManualClock};
use callwire_store::{Call, Database};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::store::{CallStore, LocalCallStore};

pub(crate) struct Harness {
    pub bus: Arc<LocalBus>,
    pub store: Arc<LocalCallStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let bus = Arc::new(LocalBus::new());
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(LocalCallStore::new(db, bus.clone()));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        Self { bus, store, clock }
    }

    /// Persist a freshly initiated call between two new users.
    pub async fn call(&self) -> Call {
        let now = self.clock.now();
        let call = Call {
            id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            caller_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            call_type: CallType::Audio,
            status: CallStatus::Initiated,
            start_time: None,
            end_time: None,
            duration: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_call(&call).await.unwrap()
    }
}

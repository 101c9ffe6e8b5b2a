//! Routes bus change events to per-scope callbacks.
//!
//! The router keeps at most one live channel per (kind, scope id): one for
//! each user's calls, each call's offers and each connection's ICE
//! candidates. Subscribing again for the same scope closes the previous
//! channel first, so re-subscribing never leaks bus subscriptions.
//!
//! Every channel runs on its own task. A callback that panics is logged and
//! skipped; it does not stop the channel or affect any other channel.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use callwire_bus::{BusEvent, NotificationBus, SubscriptionHandle};
use callwire_shared::{ChangeKind, Topic};
use callwire_store::{Call, IceCandidate, Offer};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// A decoded row change delivered to a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvent<T> {
    pub kind: ChangeKind,
    pub row: T,
}

pub type Callback<T> = Arc<dyn Fn(RowEvent<T>) + Send + Sync>;

struct Channel {
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
}

type Channels = Mutex<HashMap<Uuid, Channel>>;

pub struct SubscriptionRouter {
    bus: Arc<dyn NotificationBus>,
    calls: Channels,
    offers: Channels,
    ice: Channels,
}

impl SubscriptionRouter {
    pub fn new(bus: Arc<dyn NotificationBus>) -> Self {
        Self {
            bus,
            calls: Mutex::new(HashMap::new()),
            offers: Mutex::new(HashMap::new()),
            ice: Mutex::new(HashMap::new()),
        }
    }

    /// Calls created for `user_id` and updates to any call involving them.
    pub fn subscribe_to_calls<F>(&self, user_id: Uuid, callback: F)
    where
        F: Fn(RowEvent<Call>) + Send + Sync + 'static,
    {
        self.open(
            &self.calls,
            user_id,
            Topic::calls(user_id),
            move |event: &RowEvent<Call>| match event.kind {
                ChangeKind::Insert => event.row.receiver_id == user_id,
                ChangeKind::Update => event.row.involves(user_id),
            },
            Arc::new(callback),
        );
    }

    /// New descriptions, offers and answers alike, stored for `call_id`.
    pub fn subscribe_to_offers<F>(&self, call_id: Uuid, callback: F)
    where
        F: Fn(RowEvent<Offer>) + Send + Sync + 'static,
    {
        self.open(
            &self.offers,
            call_id,
            Topic::offers(call_id),
            |event: &RowEvent<Offer>| event.kind == ChangeKind::Insert,
            Arc::new(callback),
        );
    }

    /// New ICE candidates stored for `connection_id`.
    pub fn subscribe_to_ice_candidates<F>(&self, connection_id: Uuid, callback: F)
    where
        F: Fn(RowEvent<IceCandidate>) + Send + Sync + 'static,
    {
        self.open(
            &self.ice,
            connection_id,
            Topic::ice_candidates(connection_id),
            |event: &RowEvent<IceCandidate>| event.kind == ChangeKind::Insert,
            Arc::new(callback),
        );
    }

    /// Returns `false` if there was nothing to close.
    pub fn unsubscribe_from_calls(&self, user_id: Uuid) -> bool {
        self.close(&self.calls, user_id)
    }

    pub fn unsubscribe_from_offers(&self, call_id: Uuid) -> bool {
        self.close(&self.offers, call_id)
    }

    pub fn unsubscribe_from_ice_candidates(&self, connection_id: Uuid) -> bool {
        self.close(&self.ice, connection_id)
    }

    /// Close every channel.
    pub fn cleanup(&self) {
        let mut closed = 0;
        for channels in [&self.calls, &self.offers, &self.ice] {
            for (_, channel) in lock(channels).drain() {
                self.shut(channel);
                closed += 1;
            }
        }
        debug!(closed, "Subscription router cleaned up");
    }

    /// Number of open channels across all kinds.
    pub fn active_subscriptions(&self) -> usize {
        [&self.calls, &self.offers, &self.ice]
            .iter()
            .map(|channels| lock(channels).len())
            .sum()
    }

    fn open<T, A>(
        &self,
        channels: &Channels,
        scope: Uuid,
        topic: Topic,
        accept: A,
        callback: Callback<T>,
    ) where
        T: DeserializeOwned + Send + 'static,
        A: Fn(&RowEvent<T>) -> bool + Send + 'static,
    {
        let (handle, receiver) = self.bus.subscribe(&topic).into_parts();
        let task = tokio::spawn(listen(topic.clone(), receiver, accept, callback));

        let previous = lock(channels).insert(scope, Channel { handle, task });
        if let Some(previous) = previous {
            debug!(topic = %topic, "Replacing existing subscription");
            self.shut(previous);
        }
        debug!(topic = %topic, "Subscription opened");
    }

    fn close(&self, channels: &Channels, scope: Uuid) -> bool {
        let removed = lock(channels).remove(&scope);
        match removed {
            Some(channel) => {
                debug!(topic = %channel.handle.topic(), "Subscription closed");
                self.shut(channel);
                true
            }
            None => false,
        }
    }

    fn shut(&self, channel: Channel) {
        channel.task.abort();
        self.bus.unsubscribe(channel.handle);
    }
}

impl Drop for SubscriptionRouter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn lock(channels: &Channels) -> MutexGuard<'_, HashMap<Uuid, Channel>> {
    channels.lock().unwrap_or_else(|e| e.into_inner())
}

async fn listen<T, A>(
    topic: Topic,
    mut receiver: mpsc::UnboundedReceiver<BusEvent>,
    accept: A,
    callback: Callback<T>,
) where
    T: DeserializeOwned,
    A: Fn(&RowEvent<T>) -> bool,
{
    while let Some(event) = receiver.recv().await {
        let row = match event.decode::<T>() {
            Ok(row) => row,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Undecodable change event");
                continue;
            }
        };
        let event = RowEvent {
            kind: event.kind,
            row,
        };
        if !accept(&event) {
            trace!(topic = %topic, "Event filtered out");
            continue;
        }

        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            warn!(topic = %topic, "Subscription callback panicked");
        }
    }
    trace!(topic = %topic, "Listener finished");
}

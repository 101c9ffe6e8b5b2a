//! Publish/subscribe transport for row-change events.
//!
//! [`LocalBus`] is an in-process implementation: every subscription owns an
//! unbounded `tokio::sync::mpsc` channel, and publishing fans an event out to
//! each live subscriber of its topic. A slow subscriber buffers rather than
//! losing events. Delivery is ordered per topic; nothing orders events across
//! topics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use callwire_shared::Topic;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::messages::BusEvent;

/// Identifies one live subscription. Consumed by [`NotificationBus::unsubscribe`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

/// A live subscription: its handle plus the receiving end of its channel.
///
/// The receiver yields `None` once the subscription is closed.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub receiver: mpsc::UnboundedReceiver<BusEvent>,
}

impl Subscription {
    pub fn into_parts(self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<BusEvent>) {
        (self.handle, self.receiver)
    }
}

pub trait NotificationBus: Send + Sync {
    /// Publish an event on its topic. Returns how many subscribers it reached.
    fn publish(&self, event: BusEvent) -> usize;

    /// Open a live subscription on a topic.
    fn subscribe(&self, topic: &Topic) -> Subscription;

    /// Close a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

type Subscribers = HashMap<u64, mpsc::UnboundedSender<BusEvent>>;

/// In-process bus shared by every participant running in the same process.
#[derive(Default)]
pub struct LocalBus {
    next_id: AtomicU64,
    topics: Mutex<HashMap<Topic, Subscribers>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.lock().get(topic).map(HashMap::len).unwrap_or(0)
    }

    /// Number of topics with at least one live subscription.
    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, Subscribers>> {
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationBus for LocalBus {
    fn publish(&self, event: BusEvent) -> usize {
        let mut topics = self.lock();
        let Some(subscribers) = topics.get_mut(&event.topic) else {
            trace!(topic = %event.topic, "No subscribers, dropping event");
            return 0;
        };

        // A failed send means the receiver was dropped without unsubscribing.
        subscribers.retain(|_, sender| sender.send(event.clone()).is_ok());
        let reached = subscribers.len();
        debug!(topic = %event.topic, kind = ?event.kind, reached, "Published event");

        if subscribers.is_empty() {
            topics.remove(&event.topic);
        }
        reached
    }

    fn subscribe(&self, topic: &Topic) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock()
            .entry(topic.clone())
            .or_default()
            .insert(id, sender);

        debug!(topic = %topic, id, "Subscribed");

        Subscription {
            handle: SubscriptionHandle {
                id,
                topic: topic.clone(),
            },
            receiver,
        }
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut topics = self.lock();
        let Some(subscribers) = topics.get_mut(&handle.topic) else {
            return;
        };
        if subscribers.remove(&handle.id).is_none() {
            return;
        }
        debug!(topic = %handle.topic, id = handle.id, "Unsubscribed");

        if subscribers.is_empty() {
            topics.remove(&handle.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use callwire_shared::ChangeKind;
    use uuid::Uuid;

    use super::*;

    fn topic(n: u128) -> Topic {
        Topic::offers(Uuid::from_u128(n))
    }

    fn event(t: &Topic, n: u32) -> BusEvent {
        BusEvent::insert(t.clone(), &n).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_in_publish_order() {
        let bus = LocalBus::new();
        let t = topic(1);
        let mut sub = bus.subscribe(&t);

        for n in 0..5 {
            assert_eq!(bus.publish(event(&t, n)), 1);
        }

        for n in 0..5u32 {
            let got = sub.receiver.recv().await.unwrap();
            assert_eq!(got.kind, ChangeKind::Insert);
            assert_eq!(got.decode::<u32>().unwrap(), n);
        }
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = LocalBus::new();
        let (a, b) = (topic(1), topic(2));
        let mut sub_a = bus.subscribe(&a);
        let _sub_b = bus.subscribe(&b);

        bus.publish(event(&b, 9));
        bus.publish(event(&a, 1));

        assert_eq!(sub_a.receiver.recv().await.unwrap().decode::<u32>().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_burst_is_buffered_not_dropped() {
        let bus = LocalBus::new();
        let t = topic(5);
        let mut sub = bus.subscribe(&t);

        // Nothing is received until the whole burst has been published.
        for n in 0..1_000 {
            bus.publish(event(&t, n));
        }
        for n in 0..1_000u32 {
            assert_eq!(sub.receiver.recv().await.unwrap().decode::<u32>().unwrap(), n);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_receiver() {
        let bus = LocalBus::new();
        let t = topic(6);
        let (handle, mut receiver) = bus.subscribe(&t).into_parts();

        bus.unsubscribe(handle);
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = LocalBus::new();
        let t = topic(7);
        let sub = bus.subscribe(&t);
        drop(sub.receiver);

        assert_eq!(bus.publish(event(&t, 0)), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = LocalBus::new();
        assert_eq!(bus.publish(event(&topic(3), 0)), 0);
    }

    #[test]
    fn test_unsubscribe_drops_topic_when_last_leaves() {
        let bus = LocalBus::new();
        let t = topic(4);
        let first = bus.subscribe(&t);
        let second = bus.subscribe(&t);
        assert_eq!(bus.subscriber_count(&t), 2);

        bus.unsubscribe(first.handle);
        assert_eq!(bus.subscriber_count(&t), 1);

        bus.unsubscribe(second.handle);
        assert_eq!(bus.subscriber_count(&t), 0);
        assert_eq!(bus.topic_count(), 0);
    }
}

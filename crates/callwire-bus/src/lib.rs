// Topic-keyed notification bus carrying row-change events.

pub mod bus;
pub mod error;
pub mod messages;

pub use bus::{LocalBus, NotificationBus, Subscription, SubscriptionHandle};
pub use error::BusError;
pub use messages::BusEvent;

//! # callwire-signal
//!
//! Call signaling core for peer-to-peer audio/video calls between matched
//! users. The media itself flows directly between peers; this crate moves
//! only the control plane through a shared store and its change feed:
//!
//! - [`CallSessionManager`]: call lifecycle and duration accounting.
//! - [`ConnectionRegistry`]: per-participant endpoints with a bounded cache.
//! - [`SignalingRelay`]: session descriptions and ICE candidates.
//! - [`SubscriptionRouter`]: change events dispatched to callbacks.
//! - [`QualityAggregator`]: quality telemetry and call statistics.
//!
//! [`CallService`] wires them together for one participant.

pub mod config;
pub mod error;
pub mod identity;
pub mod quality;
pub mod registry;
pub mod router;
pub mod service;
pub mod session;
pub mod signaling;
pub mod store;

#[cfg(test)]
mod testutil;

pub use config::SignalConfig;
pub use error::{CallError, Result};
pub use identity::{IdentityProvider, StaticIdentity};
pub use quality::{CallStats, QualityAggregator};
pub use registry::ConnectionRegistry;
pub use router::{RowEvent, SubscriptionRouter};
pub use service::CallService;
pub use session::CallSessionManager;
pub use signaling::{MediaEngine, SignalingRelay};
pub use store::{CallStore, LocalCallStore};

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber for the embedding app.
///
/// `RUST_LOG` overrides the default filter. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("callwire_signal=debug,callwire_store=info,callwire_bus=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

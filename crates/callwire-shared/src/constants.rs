/// Topic prefix for call row changes, scoped by user id.
pub const TOPIC_CALLS: &str = "calls";

/// Topic prefix for offer/answer inserts, scoped by call id.
pub const TOPIC_OFFERS: &str = "offers";

/// Topic prefix for ICE candidate inserts, scoped by connection id.
pub const TOPIC_ICE_CANDIDATES: &str = "ice_candidates";

/// Default number of connection entries held by the registry cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Default page size for call history queries.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Default ring timeout applied by callers that opt into one (seconds).
pub const DEFAULT_RING_TIMEOUT_SECS: u64 = 45;

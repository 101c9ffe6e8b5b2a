//! Row builders for store tests.

use callwire_shared::{CallStatus, CallType};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::{Call, Connection, MatchContext};

/// A fixed, microsecond-aligned instant so rows compare equal after a
/// storage round trip.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub(crate) fn new_call(match_id: Uuid, at: DateTime<Utc>) -> Call {
    Call {
        id: Uuid::new_v4(),
        match_id,
        caller_id: Uuid::new_v4(),
        receiver_id: Uuid::new_v4(),
        call_type: CallType::Audio,
        status: CallStatus::Initiated,
        start_time: None,
        end_time: None,
        duration: None,
        created_at: at,
        updated_at: at,
    }
}

pub(crate) fn new_connection(call: &Call, user_id: Uuid, at: DateTime<Utc>) -> Connection {
    Connection {
        id: Uuid::new_v4(),
        call_id: call.id,
        user_id,
        peer_connection_id: format!("pc-{user_id}"),
        is_connected: false,
        updated_at: at,
    }
}

pub(crate) fn new_match(at: DateTime<Utc>) -> MatchContext {
    MatchContext {
        id: Uuid::new_v4(),
        user1_id: Uuid::new_v4(),
        user2_id: Uuid::new_v4(),
        created_at: at,
    }
}

//! Record structs persisted in the call database.
//!
//! Every struct derives `Serialize` and `Deserialize` so rows can be carried
//! verbatim as notification-bus payloads and handed to the UI layer.

use callwire_shared::{CallStatus, CallType, SdpType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// One call attempt between two matched users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Call {
    pub id: Uuid,
    /// The match the call belongs to.
    pub match_id: Uuid,
    pub caller_id: Uuid,
    pub receiver_id: Uuid,
    pub call_type: CallType,
    pub status: CallStatus,
    /// Stamped on the transition into `Connected`.
    pub start_time: Option<DateTime<Utc>>,
    /// Stamped on the transition into a terminal status.
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds, present only when both start and end are known.
    pub duration: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Call {
    /// Whether `user_id` is the caller or the receiver.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.caller_id == user_id || self.receiver_id == user_id
    }

    /// The other participant relative to `user_id`.
    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.caller_id == user_id {
            self.receiver_id
        } else {
            self.caller_id
        }
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A participant's registered signaling endpoint for a call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: Uuid,
    pub call_id: Uuid,
    pub user_id: Uuid,
    /// Identifier of the local peer connection in the media engine.
    pub peer_connection_id: String,
    pub is_connected: bool,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to a [`Connection`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub peer_connection_id: Option<String>,
    pub is_connected: Option<bool>,
}

// ---------------------------------------------------------------------------
// Offer
// ---------------------------------------------------------------------------

/// A session description sent from one participant to the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offer {
    pub id: Uuid,
    pub call_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    /// Opaque SDP payload, never parsed here.
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ICE candidate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceCandidate {
    pub id: Uuid,
    pub connection_id: Uuid,
    /// Opaque candidate line.
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u32>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Quality telemetry
// ---------------------------------------------------------------------------

/// A single call-quality measurement reported by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualitySample {
    pub call_id: Uuid,
    pub user_id: Uuid,
    pub audio_level: f64,
    pub video_quality: Option<f64>,
    /// Round-trip latency in milliseconds.
    pub network_latency: f64,
    /// Packet loss in percent.
    pub packet_loss: f64,
    /// Jitter in milliseconds.
    pub jitter: f64,
    pub timestamp: DateTime<Utc>,
}

/// Averages over every sample recorded for a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualitySummary {
    pub call_id: Uuid,
    pub sample_count: u64,
    pub avg_audio_level: f64,
    pub avg_network_latency: f64,
    pub avg_packet_loss: f64,
    pub avg_jitter: f64,
}

// ---------------------------------------------------------------------------
// Match context
// ---------------------------------------------------------------------------

/// The slice of a match record that call history is joined against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchContext {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A terminal call as seen by one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallHistoryEntry {
    pub call: Call,
    /// `None` when the match record is not (or no longer) known locally.
    pub match_context: Option<MatchContext>,
    /// The other participant.
    pub peer_id: Uuid,
}

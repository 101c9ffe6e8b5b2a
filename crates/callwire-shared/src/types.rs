use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{TOPIC_CALLS, TOPIC_ICE_CANDIDATES, TOPIC_OFFERS};
use crate::error::ParseEnumError;

// ---------------------------------------------------------------------------
// Call status
// ---------------------------------------------------------------------------

/// Lifecycle state of a call.
///
/// `Initiated` is the initial state; `Ended`, `Missed` and `Rejected` are
/// absorbing. Status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Connected,
    Ended,
    Missed,
    Rejected,
}

impl CallStatus {
    pub const TERMINAL: [CallStatus; 3] = [Self::Ended, Self::Missed, Self::Rejected];
    pub const ACTIVE: [CallStatus; 3] = [Self::Initiated, Self::Ringing, Self::Connected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Missed => "missed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Missed | Self::Rejected)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Initiated => 0,
            Self::Ringing => 1,
            Self::Connected => 2,
            Self::Ended | Self::Missed | Self::Rejected => 3,
        }
    }

    /// Whether moving from `self` to `next` is a forward step.
    ///
    /// Staying in the same status is not a transition and returns `false`.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "ringing" => Ok(Self::Ringing),
            "connected" => Ok(Self::Connected),
            "ended" => Ok(Self::Ended),
            "missed" => Ok(Self::Missed),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseEnumError::new("CallStatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Call type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(ParseEnumError::new("CallType", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// SDP type
// ---------------------------------------------------------------------------

/// Whether a session description row is an offer or an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdpType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(Self::Offer),
            "answer" => Ok(Self::Answer),
            other => Err(ParseEnumError::new("SdpType", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus topics
// ---------------------------------------------------------------------------

/// Kind of row change carried by a bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A bus topic of the form `{entity}:{scope_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub fn calls(user_id: Uuid) -> Self {
        Self(format!("{TOPIC_CALLS}:{user_id}"))
    }

    pub fn offers(call_id: Uuid) -> Self {
        Self(format!("{TOPIC_OFFERS}:{call_id}"))
    }

    pub fn ice_candidates(connection_id: Uuid) -> Self {
        Self(format!("{TOPIC_ICE_CANDIDATES}:{connection_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entity half of the topic (`calls`, `offers`, ...).
    pub fn entity(&self) -> &str {
        self.0.split_once(':').map(|(e, _)| e).unwrap_or(&self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use callwire_shared::{CallStatus, Severity};
use callwire_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the signaling core. Every variant carries a
/// [`Severity`] through [`CallError::severity`].
#[derive(Error, Debug)]
pub enum CallError {
    /// No authenticated identity.
    #[error("Not authenticated")]
    Auth,

    /// Persistence failure, with the operation that hit it.
    #[error("Store error during {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    /// The record an operation needs to mutate does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Only the caller and receiver may register a connection for a call.
    #[error("User {user_id} is not a participant of call {call_id}")]
    NotParticipant { call_id: Uuid, user_id: Uuid },

    #[error("Invalid call status transition: {from} -> {to}")]
    InvalidTransition { from: CallStatus, to: CallStatus },

    /// Quality-sample write failure.
    #[error("Telemetry write failed: {0}")]
    Telemetry(String),

    /// The local media engine rejected a description or candidate.
    #[error("Media engine rejected input after {applied} applied: {reason}")]
    Media { applied: usize, reason: String },
}

impl CallError {
    pub fn severity(&self) -> Severity {
        match self {
            CallError::Auth
            | CallError::NotParticipant { .. }
            | CallError::InvalidTransition { .. } => Severity::Fatal,
            CallError::Store { .. } | CallError::NotFound { .. } | CallError::Media { .. } => {
                Severity::Recoverable
            }
            CallError::Telemetry(_) => Severity::Advisory,
        }
    }

    /// Wrap a store failure with the name of the failing operation.
    pub(crate) fn store(op: &'static str) -> impl FnOnce(StoreError) -> CallError {
        move |source| CallError::Store { op, source }
    }
}

pub type Result<T> = std::result::Result<T, CallError>;

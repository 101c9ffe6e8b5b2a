use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected payload on topic {topic}: {reason}")]
    UnexpectedPayload { topic: String, reason: String },
}

use callwire_shared::{ChangeKind, Topic};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// A row change published on a topic. The payload is the changed row as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusEvent {
    pub topic: Topic,
    pub kind: ChangeKind,
    pub payload: serde_json::Value,
}

impl BusEvent {
    pub fn new<T: Serialize>(topic: Topic, kind: ChangeKind, row: &T) -> Result<Self, BusError> {
        Ok(Self {
            topic,
            kind,
            payload: serde_json::to_value(row)?,
        })
    }

    pub fn insert<T: Serialize>(topic: Topic, row: &T) -> Result<Self, BusError> {
        Self::new(topic, ChangeKind::Insert, row)
    }

    pub fn update<T: Serialize>(topic: Topic, row: &T) -> Result<Self, BusError> {
        Self::new(topic, ChangeKind::Update, row)
    }

    /// Decode the payload into a typed row.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| BusError::UnexpectedPayload {
            topic: self.topic.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: u32,
        sdp: String,
    }

    #[test]
    fn test_decode_typed_payload() {
        let row = Row {
            id: 7,
            sdp: "v=0".into(),
        };
        let event = BusEvent::insert(Topic::offers(Default::default()), &row).unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.decode::<Row>().unwrap(), row);
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let event = BusEvent::update(Topic::calls(Default::default()), &42u32).unwrap();
        assert!(matches!(
            event.decode::<Row>(),
            Err(BusError::UnexpectedPayload { .. })
        ));
    }
}

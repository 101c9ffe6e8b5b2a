//! Session descriptions and ICE candidates exchanged through the store.
//!
//! [`SignalingRelay`] writes offers, answers and trickled candidates; the
//! subscribed peer reads them back and feeds them to its [`MediaEngine`].

use std::sync::Arc;

use async_trait::async_trait;
use callwire_shared::{Clock, SdpType};
use callwire_store::{IceCandidate, Offer, OptionalExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CallError, Result};
use crate::store::CallStore;

/// The local WebRTC stack, as far as signaling needs it.
///
/// SDP and candidate strings are passed through untouched.
#[async_trait]
pub trait MediaEngine: Send {
    async fn set_remote_description(&mut self, sdp_type: SdpType, sdp: &str)
        -> anyhow::Result<()>;

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> anyhow::Result<()>;
}

/// Stores and fetches session descriptions and ICE candidates.
pub struct SignalingRelay {
    store: Arc<dyn CallStore>,
    clock: Arc<dyn Clock>,
}

impl SignalingRelay {
    pub fn new(store: Arc<dyn CallStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_offer(
        &self,
        call_id: Uuid,
        from_user_id: Uuid,
        to_user_id: Uuid,
        sdp: &str,
        sdp_type: SdpType,
    ) -> Result<Offer> {
        let offer = Offer {
            id: Uuid::new_v4(),
            call_id,
            from_user_id,
            to_user_id,
            sdp: sdp.to_string(),
            sdp_type,
            created_at: self.clock.now(),
        };

        let offer = self
            .store
            .insert_offer(&offer)
            .await
            .map_err(CallError::store("create offer"))?;

        debug!(
            call = %call_id,
            from = %from_user_id,
            to = %to_user_id,
            sdp_type = %sdp_type,
            "Stored session description"
        );
        Ok(offer)
    }

    /// Newest description of the given type for a call. Descriptions of the
    /// other type never shadow it.
    pub async fn get_latest_offer(&self, call_id: Uuid, sdp_type: SdpType) -> Result<Option<Offer>> {
        self.store
            .latest_offer(call_id, sdp_type)
            .await
            .optional()
            .map_err(CallError::store("get latest offer"))
    }

    pub async fn add_ice_candidate(
        &self,
        connection_id: Uuid,
        candidate: &str,
        sdp_mid: Option<&str>,
        sdp_mline_index: Option<u32>,
    ) -> Result<IceCandidate> {
        let candidate = IceCandidate {
            id: Uuid::new_v4(),
            connection_id,
            candidate: candidate.to_string(),
            sdp_mid: sdp_mid.map(str::to_string),
            sdp_mline_index,
            created_at: self.clock.now(),
        };

        let candidate = self
            .store
            .insert_ice_candidate(&candidate)
            .await
            .map_err(CallError::store("add ICE candidate"))?;

        debug!(connection = %connection_id, "Stored ICE candidate");
        Ok(candidate)
    }

    /// Every candidate of a connection, oldest first.
    pub async fn get_ice_candidates(&self, connection_id: Uuid) -> Result<Vec<IceCandidate>> {
        self.store
            .ice_candidates_for_connection(connection_id)
            .await
            .map_err(CallError::store("get ICE candidates"))
    }

    /// Hand the newest description of `sdp_type` to the media engine.
    /// Returns the applied description, or `None` if there is none yet.
    pub async fn apply_latest_offer<E: MediaEngine + ?Sized>(
        &self,
        call_id: Uuid,
        sdp_type: SdpType,
        engine: &mut E,
    ) -> Result<Option<Offer>> {
        let Some(offer) = self.get_latest_offer(call_id, sdp_type).await? else {
            return Ok(None);
        };

        engine
            .set_remote_description(offer.sdp_type, &offer.sdp)
            .await
            .map_err(|e| {
                warn!(call = %call_id, error = %e, "Media engine rejected description");
                CallError::Media {
                    applied: 0,
                    reason: e.to_string(),
                }
            })?;
        Ok(Some(offer))
    }

    /// Feed a connection's candidates to the media engine in order, stopping
    /// at the first one it rejects. Returns how many were applied.
    pub async fn apply_ice_candidates<E: MediaEngine + ?Sized>(
        &self,
        connection_id: Uuid,
        engine: &mut E,
    ) -> Result<usize> {
        let candidates = self.get_ice_candidates(connection_id).await?;

        for (applied, candidate) in candidates.iter().enumerate() {
            if let Err(e) = engine.add_ice_candidate(candidate).await {
                warn!(
                    connection = %connection_id,
                    applied,
                    error = %e,
                    "Media engine rejected ICE candidate"
                );
                return Err(CallError::Media {
                    applied,
                    reason: e.to_string(),
                });
            }
        }
        Ok(candidates.len())
    }
}

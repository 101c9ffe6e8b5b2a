//! Call lifecycle state machine and duration accounting.

use std::sync::Arc;
use std::time::Duration;

use callwire_shared::{CallStatus, CallType, Clock};
use callwire_store::{Call, CallHistoryEntry, OptionalExt};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CallError, Result};
use crate::identity::IdentityProvider;
use crate::store::CallStore;

/// Creates calls and drives their status.
///
/// Concurrent updates to one call are not serialized here; the store
/// arbitrates (last write wins).
#[derive(Clone)]
pub struct CallSessionManager {
    store: Arc<dyn CallStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    history_limit: u32,
}

impl CallSessionManager {
    pub fn new(
        store: Arc<dyn CallStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        history_limit: u32,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
            history_limit,
        }
    }

    /// Start a call from the signed-in user to `receiver_id`.
    pub async fn initiate_call(
        &self,
        match_id: Uuid,
        receiver_id: Uuid,
        call_type: CallType,
    ) -> Result<Call> {
        let caller_id = self.identity.current_user().await?;
        let now = self.clock.now();

        let call = Call {
            id: Uuid::new_v4(),
            match_id,
            caller_id,
            receiver_id,
            call_type,
            status: CallStatus::Initiated,
            start_time: None,
            end_time: None,
            duration: None,
            created_at: now,
            updated_at: now,
        };

        let call = self
            .store
            .insert_call(&call)
            .await
            .map_err(CallError::store("initiate call"))?;

        info!(
            call = %call.id,
            match_id = %match_id,
            receiver = %receiver_id,
            call_type = %call_type,
            "Call initiated"
        );
        Ok(call)
    }

    /// Move a call to `status`.
    ///
    /// Entering `Connected` stamps the start time; entering a terminal status
    /// stamps the end time and, if the call was ever connected, its duration.
    /// Requesting the status the call already has changes nothing.
    pub async fn update_call_status(&self, call_id: Uuid, status: CallStatus) -> Result<Call> {
        let current = self.load(call_id).await?;
        self.transition(current, status).await
    }

    pub async fn get_call(&self, call_id: Uuid) -> Result<Option<Call>> {
        self.store
            .get_call(call_id)
            .await
            .optional()
            .map_err(CallError::store("get call"))
    }

    /// The most recently created call of a match that has not finished yet.
    pub async fn get_active_call(&self, match_id: Uuid) -> Result<Option<Call>> {
        self.store
            .latest_active_call(match_id)
            .await
            .optional()
            .map_err(CallError::store("get active call"))
    }

    /// Finished calls involving `user_id`, newest first, with match context.
    pub async fn get_call_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<CallHistoryEntry>> {
        let limit = limit.unwrap_or(self.history_limit);
        self.store
            .call_history(user_id, limit)
            .await
            .map_err(CallError::store("get call history"))
    }

    /// Mark the call missed if it is still unanswered after `timeout`.
    ///
    /// Nothing times out on its own; callers opt in per call and may abort
    /// the returned task once the call is answered.
    pub fn watch_ring_timeout(&self, call_id: Uuid, timeout: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let call = match manager.load(call_id).await {
                Ok(call) => call,
                Err(e) => {
                    warn!(call = %call_id, error = %e, "Ring timeout could not load call");
                    return;
                }
            };

            if !matches!(call.status, CallStatus::Initiated | CallStatus::Ringing) {
                debug!(call = %call_id, status = %call.status, "Ring timeout: call already answered");
                return;
            }

            match manager.transition(call, CallStatus::Missed).await {
                Ok(_) => info!(call = %call_id, "Ring timeout: call missed"),
                Err(e) => warn!(call = %call_id, error = %e, "Ring timeout transition failed"),
            }
        })
    }

    async fn load(&self, call_id: Uuid) -> Result<Call> {
        self.get_call(call_id).await?.ok_or(CallError::NotFound {
            entity: "call",
            id: call_id,
        })
    }

    async fn transition(&self, current: Call, status: CallStatus) -> Result<Call> {
        if current.status == status {
            debug!(call = %current.id, status = %status, "Status unchanged");
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(CallError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let now = self.clock.now();
        let mut next = current;
        let from = next.status;
        next.status = status;
        next.updated_at = now;

        if status == CallStatus::Connected {
            next.start_time = Some(now);
        }
        if status.is_terminal() {
            next.end_time = Some(now);
            next.duration = next.start_time.map(|start| duration_secs(start, now));
        }

        let call = self
            .store
            .update_call(&next)
            .await
            .map_err(CallError::store("update call status"))?;

        info!(
            call = %call.id,
            from = %from,
            to = %status,
            duration = ?call.duration,
            "Call status updated"
        );
        Ok(call)
    }
}

/// Whole seconds between two instants, rounded half up, never negative.
pub fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + 500) / 1000
}

#[cfg(test)]
mod tests {
    use chrono::Duration as TimeDelta;

    use super::*;
    use crate::identity::StaticIdentity;
    use crate::testutil::Harness;

    fn manager(h: &Harness, user: Option<Uuid>) -> CallSessionManager {
        let identity = match user {
            Some(u) => StaticIdentity::signed_in(u),
            None => StaticIdentity::signed_out(),
        };
        CallSessionManager::new(h.store.clone(), Arc::new(identity), h.clock.clone(), 50)
    }

    #[test]
    fn test_duration_rounding() {
        let t = Utc::now();
        assert_eq!(duration_secs(t, t + TimeDelta::milliseconds(30_000)), 30);
        assert_eq!(duration_secs(t, t + TimeDelta::milliseconds(1_499)), 1);
        assert_eq!(duration_secs(t, t + TimeDelta::milliseconds(1_500)), 2);
        assert_eq!(duration_secs(t + TimeDelta::seconds(5), t), 0);
    }

    #[tokio::test]
    async fn test_initiate_requires_identity() {
        let h = Harness::new();
        let err = manager(&h, None)
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Auth));
    }

    #[tokio::test]
    async fn test_initiated_call_has_no_times() {
        let h = Harness::new();
        let caller = Uuid::new_v4();
        let call = manager(&h, Some(caller))
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Video)
            .await
            .unwrap();

        assert_eq!(call.status, CallStatus::Initiated);
        assert_eq!(call.caller_id, caller);
        assert!(call.start_time.is_none() && call.end_time.is_none() && call.duration.is_none());
    }

    #[tokio::test]
    async fn test_connected_then_ended_records_duration() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let call = sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();

        sessions
            .update_call_status(call.id, CallStatus::Ringing)
            .await
            .unwrap();
        let connected = sessions
            .update_call_status(call.id, CallStatus::Connected)
            .await
            .unwrap();
        assert!(connected.start_time.is_some());

        h.clock.advance(TimeDelta::milliseconds(42_400));
        let ended = sessions
            .update_call_status(call.id, CallStatus::Ended)
            .await
            .unwrap();
        assert_eq!(ended.duration, Some(42));
        assert!(ended.end_time.is_some());
    }

    #[tokio::test]
    async fn test_unanswered_call_has_no_duration() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));

        for terminal in [CallStatus::Missed, CallStatus::Rejected] {
            let call = sessions
                .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
                .await
                .unwrap();
            h.clock.advance(TimeDelta::seconds(10));
            let done = sessions.update_call_status(call.id, terminal).await.unwrap();
            assert!(done.end_time.is_some());
            assert!(done.duration.is_none());
        }
    }

    #[tokio::test]
    async fn test_repeated_connected_keeps_start_time() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let call = sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();

        let first = sessions
            .update_call_status(call.id, CallStatus::Connected)
            .await
            .unwrap();
        h.clock.advance(TimeDelta::seconds(3));
        let second = sessions
            .update_call_status(call.id, CallStatus::Connected)
            .await
            .unwrap();
        assert_eq!(first.start_time, second.start_time);
    }

    #[tokio::test]
    async fn test_terminal_status_is_absorbing() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let call = sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();
        sessions
            .update_call_status(call.id, CallStatus::Rejected)
            .await
            .unwrap();

        let err = sessions
            .update_call_status(call.id, CallStatus::Connected)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::InvalidTransition {
                from: CallStatus::Rejected,
                to: CallStatus::Connected
            }
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_call_is_not_found() {
        let h = Harness::new();
        let err = manager(&h, None)
            .update_call_status(Uuid::new_v4(), CallStatus::Ringing)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::NotFound { entity: "call", .. }));
    }

    #[tokio::test]
    async fn test_active_call_is_latest_non_terminal() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let match_id = Uuid::new_v4();
        assert!(sessions.get_active_call(match_id).await.unwrap().is_none());

        let first = sessions
            .initiate_call(match_id, Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();
        h.clock.advance(TimeDelta::seconds(1));
        let second = sessions
            .initiate_call(match_id, Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();
        assert_eq!(
            sessions.get_active_call(match_id).await.unwrap().unwrap().id,
            second.id
        );

        sessions
            .update_call_status(second.id, CallStatus::Missed)
            .await
            .unwrap();
        assert_eq!(
            sessions.get_active_call(match_id).await.unwrap().unwrap().id,
            first.id
        );
    }

    #[tokio::test]
    async fn test_history_lists_terminal_calls_newest_first() {
        let h = Harness::new();
        let me = Uuid::new_v4();
        let sessions = manager(&h, Some(me));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let call = sessions
                .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
                .await
                .unwrap();
            sessions
                .update_call_status(call.id, CallStatus::Ended)
                .await
                .unwrap();
            ids.push(call.id);
            h.clock.advance(TimeDelta::seconds(1));
        }
        // Still ringing: not history.
        sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();

        let history = sessions.get_call_history(me, None).await.unwrap();
        let got: Vec<_> = history.iter().map(|e| e.call.id).collect();
        ids.reverse();
        assert_eq!(got, ids);

        assert_eq!(sessions.get_call_history(me, Some(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ring_timeout_marks_missed() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let call = sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();

        sessions
            .watch_ring_timeout(call.id, Duration::from_millis(10))
            .await
            .unwrap();

        let call = sessions.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Missed);
        assert!(call.duration.is_none());
    }

    #[tokio::test]
    async fn test_ring_timeout_leaves_answered_call() {
        let h = Harness::new();
        let sessions = manager(&h, Some(Uuid::new_v4()));
        let call = sessions
            .initiate_call(Uuid::new_v4(), Uuid::new_v4(), CallType::Audio)
            .await
            .unwrap();

        let watcher = sessions.watch_ring_timeout(call.id, Duration::from_millis(10));
        sessions
            .update_call_status(call.id, CallStatus::Connected)
            .await
            .unwrap();
        watcher.await.unwrap();

        let call = sessions.get_call(call.id).await.unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Connected);
    }
}

//! Call-quality telemetry and per-user call statistics.

use std::sync::Arc;

use callwire_shared::CallStatus;
use callwire_store::{Call, QualitySample, QualitySummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CallError, Result};
use crate::store::CallStore;

/// Aggregates over a user's finished calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallStats {
    pub total_calls: u64,
    /// Seconds. Calls that never connected contribute nothing.
    pub total_duration: i64,
    pub average_duration: i64,
    pub missed_calls: u64,
    /// Calls that ended normally. Rejected calls are not counted.
    pub successful_calls: u64,
    /// Not computed yet; always 0.
    pub average_quality: f64,
}

impl CallStats {
    /// Summarize terminal calls. Non-terminal calls in the input are ignored.
    pub fn from_calls(calls: &[Call]) -> Self {
        let mut stats = CallStats::default();
        for call in calls.iter().filter(|c| c.status.is_terminal()) {
            stats.total_calls += 1;
            stats.total_duration += call.duration.unwrap_or(0);
            match call.status {
                CallStatus::Ended => stats.successful_calls += 1,
                CallStatus::Missed => stats.missed_calls += 1,
                _ => {}
            }
        }
        if stats.total_calls > 0 {
            let avg = stats.total_duration as f64 / stats.total_calls as f64;
            stats.average_duration = avg.round() as i64;
        }
        stats
    }
}

pub struct QualityAggregator {
    store: Arc<dyn CallStore>,
}

impl QualityAggregator {
    pub fn new(store: Arc<dyn CallStore>) -> Self {
        Self { store }
    }

    /// Record a sample. Best effort: a failed write is logged and reported
    /// through the return value only.
    pub async fn report_call_quality(&self, sample: &QualitySample) -> bool {
        match self.store.insert_quality_sample(sample).await {
            Ok(()) => {
                debug!(call = %sample.call_id, user = %sample.user_id, "Quality sample recorded");
                true
            }
            Err(e) => {
                let err = CallError::Telemetry(e.to_string());
                warn!(
                    call = %sample.call_id,
                    severity = %err.severity(),
                    error = %err,
                    "Dropped quality sample"
                );
                false
            }
        }
    }

    pub async fn get_call_stats(&self, user_id: Uuid) -> Result<CallStats> {
        let calls = self
            .store
            .terminal_calls_for_user(user_id)
            .await
            .map_err(CallError::store("get call stats"))?;
        Ok(CallStats::from_calls(&calls))
    }

    pub async fn get_quality_summary(&self, call_id: Uuid) -> Result<QualitySummary> {
        self.store
            .quality_summary(call_id)
            .await
            .map_err(CallError::store("get quality summary"))
    }
}

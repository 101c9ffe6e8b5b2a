use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{QualitySample, QualitySummary};
use crate::row::{ts, ts_at, uuid_at};

impl Database {
    pub fn insert_quality_sample(&self, sample: &QualitySample) -> Result<()> {
        self.conn().execute(
            "INSERT INTO quality_samples (call_id, user_id, audio_level, video_quality,
                                          network_latency, packet_loss, jitter, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sample.call_id.to_string(),
                sample.user_id.to_string(),
                sample.audio_level,
                sample.video_quality,
                sample.network_latency,
                sample.packet_loss,
                sample.jitter,
                ts(&sample.timestamp),
            ],
        )?;
        Ok(())
    }

    pub fn quality_samples_for_call(&self, call_id: Uuid) -> Result<Vec<QualitySample>> {
        let mut stmt = self.conn().prepare(
            "SELECT call_id, user_id, audio_level, video_quality, network_latency,
                    packet_loss, jitter, timestamp
             FROM quality_samples
             WHERE call_id = ?1
             ORDER BY timestamp ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![call_id.to_string()], |r| {
            Ok(QualitySample {
                call_id: uuid_at(r, 0)?,
                user_id: uuid_at(r, 1)?,
                audio_level: r.get(2)?,
                video_quality: r.get(3)?,
                network_latency: r.get(4)?,
                packet_loss: r.get(5)?,
                jitter: r.get(6)?,
                timestamp: ts_at(r, 7)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Averages over every sample of a call.  A call with no samples yields a
    /// zeroed summary.
    pub fn quality_summary(&self, call_id: Uuid) -> Result<QualitySummary> {
        let summary = self.conn().query_row(
            "SELECT COUNT(*),
                    COALESCE(AVG(audio_level), 0.0),
                    COALESCE(AVG(network_latency), 0.0),
                    COALESCE(AVG(packet_loss), 0.0),
                    COALESCE(AVG(jitter), 0.0)
             FROM quality_samples WHERE call_id = ?1",
            params![call_id.to_string()],
            |r| {
                let count: i64 = r.get(0)?;
                Ok(QualitySummary {
                    call_id,
                    sample_count: count as u64,
                    avg_audio_level: r.get(1)?,
                    avg_network_latency: r.get(2)?,
                    avg_packet_loss: r.get(3)?,
                    avg_jitter: r.get(4)?,
                })
            },
        )?;
        Ok(summary)
    }
}

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::IceCandidate;
use crate::row::{ts, ts_at, uuid_at};

impl Database {
    pub fn insert_ice_candidate(&self, candidate: &IceCandidate) -> Result<IceCandidate> {
        self.conn().execute(
            "INSERT INTO ice_candidates (id, connection_id, candidate, sdp_mid, sdp_mline_index, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                candidate.id.to_string(),
                candidate.connection_id.to_string(),
                candidate.candidate,
                candidate.sdp_mid,
                candidate.sdp_mline_index,
                ts(&candidate.created_at),
            ],
        )?;
        Ok(candidate.clone())
    }

    /// All candidates of a connection in insertion order.
    ///
    /// Equal timestamps fall back to `rowid`, so the result always matches the
    /// order in which candidates were appended.
    pub fn ice_candidates_for_connection(&self, connection_id: Uuid) -> Result<Vec<IceCandidate>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, connection_id, candidate, sdp_mid, sdp_mline_index, created_at
             FROM ice_candidates
             WHERE connection_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![connection_id.to_string()], |r| {
            Ok(IceCandidate {
                id: uuid_at(r, 0)?,
                connection_id: uuid_at(r, 1)?,
                candidate: r.get(2)?,
                sdp_mid: r.get(3)?,
                sdp_mline_index: r.get(4)?,
                created_at: ts_at(r, 5)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

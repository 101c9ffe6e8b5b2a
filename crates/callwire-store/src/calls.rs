//! Insert, update and query operations for [`Call`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Call, CallHistoryEntry, MatchContext};
use crate::row::{enum_at, opt_ts, opt_ts_at, ts, ts_at, uuid_at};

const CALL_COLUMNS: &str = "id, match_id, caller_id, receiver_id, call_type, status, \
     start_time, end_time, duration, created_at, updated_at";

const TERMINAL_STATUSES: &str = "('ended', 'missed', 'rejected')";
const ACTIVE_STATUSES: &str = "('initiated', 'ringing', 'connected')";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new call and return the stored row.
    pub fn insert_call(&self, call: &Call) -> Result<Call> {
        self.conn().execute(
            "INSERT INTO calls (id, match_id, caller_id, receiver_id, call_type, status,
                                start_time, end_time, duration, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                call.id.to_string(),
                call.match_id.to_string(),
                call.caller_id.to_string(),
                call.receiver_id.to_string(),
                call.call_type.as_str(),
                call.status.as_str(),
                opt_ts(&call.start_time),
                opt_ts(&call.end_time),
                call.duration,
                ts(&call.created_at),
                ts(&call.updated_at),
            ],
        )?;
        Ok(call.clone())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the mutable fields of a call (status, times, duration,
    /// `updated_at`) and return the row as stored.  Last write wins.
    pub fn update_call(&self, call: &Call) -> Result<Call> {
        self.conn()
            .query_row(
                &format!(
                    "UPDATE calls
                     SET status = ?2, start_time = ?3, end_time = ?4, duration = ?5, updated_at = ?6
                     WHERE id = ?1
                     RETURNING {CALL_COLUMNS}"
                ),
                params![
                    call.id.to_string(),
                    call.status.as_str(),
                    opt_ts(&call.start_time),
                    opt_ts(&call.end_time),
                    call.duration,
                    ts(&call.updated_at),
                ],
                |r| row_to_call(r, 0),
            )
            .map_err(StoreError::from_query)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_call(&self, id: Uuid) -> Result<Call> {
        self.conn()
            .query_row(
                &format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"),
                params![id.to_string()],
                |r| row_to_call(r, 0),
            )
            .map_err(StoreError::from_query)
    }

    /// The most recently created non-terminal call for a match.
    pub fn latest_active_call(&self, match_id: Uuid) -> Result<Call> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {CALL_COLUMNS} FROM calls
                     WHERE match_id = ?1 AND status IN {ACTIVE_STATUSES}
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![match_id.to_string()],
                |r| row_to_call(r, 0),
            )
            .map_err(StoreError::from_query)
    }

    /// Every terminal call the user took part in, newest first.
    pub fn terminal_calls_for_user(&self, user_id: Uuid) -> Result<Vec<Call>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
             WHERE (caller_id = ?1 OR receiver_id = ?1) AND status IN {TERMINAL_STATUSES}
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id.to_string()], |r| row_to_call(r, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Terminal calls involving the user joined with their match context,
    /// newest first.
    pub fn call_history(&self, user_id: Uuid, limit: u32) -> Result<Vec<CallHistoryEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT c.id, c.match_id, c.caller_id, c.receiver_id, c.call_type, c.status,
                    c.start_time, c.end_time, c.duration, c.created_at, c.updated_at,
                    m.id, m.user1_id, m.user2_id, m.created_at
             FROM calls c
             LEFT JOIN matches m ON m.id = c.match_id
             WHERE (c.caller_id = ?1 OR c.receiver_id = ?1) AND c.status IN {TERMINAL_STATUSES}
             ORDER BY c.created_at DESC, c.rowid DESC
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![user_id.to_string(), limit], |r| {
            let call = row_to_call(r, 0)?;
            let match_id: Option<String> = r.get(11)?;
            let match_context = match match_id {
                Some(_) => Some(MatchContext {
                    id: uuid_at(r, 11)?,
                    user1_id: uuid_at(r, 12)?,
                    user2_id: uuid_at(r, 13)?,
                    created_at: ts_at(r, 14)?,
                }),
                None => None,
            };
            let peer_id = call.peer_of(user_id);
            Ok(CallHistoryEntry {
                call,
                match_context,
                peer_id,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a row whose call columns start at `base` to a [`Call`].
fn row_to_call(r: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<Call> {
    Ok(Call {
        id: uuid_at(r, base)?,
        match_id: uuid_at(r, base + 1)?,
        caller_id: uuid_at(r, base + 2)?,
        receiver_id: uuid_at(r, base + 3)?,
        call_type: enum_at(r, base + 4)?,
        status: enum_at(r, base + 5)?,
        start_time: opt_ts_at(r, base + 6)?,
        end_time: opt_ts_at(r, base + 7)?,
        duration: r.get(base + 8)?,
        created_at: ts_at(r, base + 9)?,
        updated_at: ts_at(r, base + 10)?,
    })
}

//! Insert, update and query operations for [`Connection`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Connection, ConnectionUpdate};
use crate::row::{ts, ts_at, uuid_at};

const CONNECTION_COLUMNS: &str =
    "id, call_id, user_id, peer_connection_id, is_connected, updated_at";

impl Database {
    pub fn insert_connection(&self, connection: &Connection) -> Result<Connection> {
        self.conn().execute(
            "INSERT INTO connections (id, call_id, user_id, peer_connection_id, is_connected, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                connection.id.to_string(),
                connection.call_id.to_string(),
                connection.user_id.to_string(),
                connection.peer_connection_id,
                connection.is_connected,
                ts(&connection.updated_at),
            ],
        )?;
        Ok(connection.clone())
    }

    /// Apply a partial update and return the row as stored.
    pub fn update_connection(
        &self,
        id: Uuid,
        update: &ConnectionUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Connection> {
        self.conn()
            .query_row(
                &format!(
                    "UPDATE connections
                     SET peer_connection_id = COALESCE(?2, peer_connection_id),
                         is_connected = COALESCE(?3, is_connected),
                         updated_at = ?4
                     WHERE id = ?1
                     RETURNING {CONNECTION_COLUMNS}"
                ),
                params![
                    id.to_string(),
                    update.peer_connection_id,
                    update.is_connected,
                    ts(&updated_at),
                ],
                row_to_connection,
            )
            .map_err(StoreError::from_query)
    }

    /// The most recently updated connection registered for a call.
    pub fn latest_connection_for_call(&self, call_id: Uuid) -> Result<Connection> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM connections
                     WHERE call_id = ?1
                     ORDER BY updated_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![call_id.to_string()],
                row_to_connection,
            )
            .map_err(StoreError::from_query)
    }

    /// A specific participant's connection for a call.
    pub fn connection_for_user(&self, call_id: Uuid, user_id: Uuid) -> Result<Connection> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {CONNECTION_COLUMNS} FROM connections
                     WHERE call_id = ?1 AND user_id = ?2
                     ORDER BY updated_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![call_id.to_string(), user_id.to_string()],
                row_to_connection,
            )
            .map_err(StoreError::from_query)
    }

    /// All connections of a call in registration order.
    pub fn connections_for_call(&self, call_id: Uuid) -> Result<Vec<Connection>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections
             WHERE call_id = ?1
             ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![call_id.to_string()], row_to_connection)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_connection(r: &rusqlite::Row<'_>) -> rusqlite::Result<Connection> {
    Ok(Connection {
        id: uuid_at(r, 0)?,
        call_id: uuid_at(r, 1)?,
        user_id: uuid_at(r, 2)?,
        peer_connection_id: r.get(3)?,
        is_connected: r.get(4)?,
        updated_at: ts_at(r, 5)?,
    })
}

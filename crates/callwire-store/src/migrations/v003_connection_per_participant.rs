use rusqlite::Connection;

// One signaling endpoint per participant per call.
const UP_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_connections_call_user ON connections(call_id, user_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

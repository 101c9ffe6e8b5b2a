use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS quality_samples (
    call_id         TEXT NOT NULL,            -- FK -> calls(id)
    user_id         TEXT NOT NULL,
    audio_level     REAL NOT NULL,
    video_quality   REAL,
    network_latency REAL NOT NULL,            -- milliseconds
    packet_loss     REAL NOT NULL,            -- percent
    jitter          REAL NOT NULL,            -- milliseconds
    timestamp       TEXT NOT NULL,
    FOREIGN KEY (call_id) REFERENCES calls(id)
);

CREATE INDEX IF NOT EXISTS idx_quality_call_ts ON quality_samples(call_id, timestamp ASC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

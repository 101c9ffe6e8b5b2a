//! v001 -- Initial schema creation.
//!
//! Creates the signaling tables: `matches`, `calls`, `connections`, `offers`
//! and `ice_candidates`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Matches (projection of the app's match records)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS matches (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID
    user1_id   TEXT NOT NULL,
    user2_id   TEXT NOT NULL,
    created_at TEXT NOT NULL                  -- RFC-3339, microseconds, UTC
);

-- ----------------------------------------------------------------
-- Calls
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS calls (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    match_id    TEXT NOT NULL,
    caller_id   TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    call_type   TEXT NOT NULL,                -- audio | video
    status      TEXT NOT NULL,                -- initiated | ringing | connected | ended | missed | rejected
    start_time  TEXT,
    end_time    TEXT,
    duration    INTEGER,                      -- whole seconds
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_calls_match_created ON calls(match_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_calls_caller ON calls(caller_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_calls_receiver ON calls(receiver_id, created_at DESC);

-- ----------------------------------------------------------------
-- Connections (one per participant per call)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS connections (
    id                 TEXT PRIMARY KEY NOT NULL,
    call_id            TEXT NOT NULL,
    user_id            TEXT NOT NULL,
    peer_connection_id TEXT NOT NULL,
    is_connected       INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    updated_at         TEXT NOT NULL,

    FOREIGN KEY (call_id) REFERENCES calls(id)
);

CREATE INDEX IF NOT EXISTS idx_connections_call ON connections(call_id, updated_at DESC);

-- ----------------------------------------------------------------
-- Offers / answers (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS offers (
    id           TEXT PRIMARY KEY NOT NULL,
    call_id      TEXT NOT NULL,
    from_user_id TEXT NOT NULL,
    to_user_id   TEXT NOT NULL,
    sdp          TEXT NOT NULL,               -- opaque
    sdp_type     TEXT NOT NULL,               -- offer | answer
    created_at   TEXT NOT NULL,

    FOREIGN KEY (call_id) REFERENCES calls(id)
);

CREATE INDEX IF NOT EXISTS idx_offers_call_type ON offers(call_id, sdp_type, created_at DESC);

-- ----------------------------------------------------------------
-- ICE candidates (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ice_candidates (
    id              TEXT PRIMARY KEY NOT NULL,
    connection_id   TEXT NOT NULL,
    candidate       TEXT NOT NULL,            -- opaque
    sdp_mid         TEXT,
    sdp_mline_index INTEGER,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (connection_id) REFERENCES connections(id)
);

CREATE INDEX IF NOT EXISTS idx_ice_connection_created ON ice_candidates(connection_id, created_at ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! Match records joined into call history.
//!
//! Matches are owned by the app's matching feature; the store keeps only the
//! participant pair so history entries can carry their context.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::MatchContext;
use crate::row::{ts, ts_at, uuid_at};

impl Database {
    /// Insert or refresh a match record.
    pub fn insert_match(&self, m: &MatchContext) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO matches (id, user1_id, user2_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                m.id.to_string(),
                m.user1_id.to_string(),
                m.user2_id.to_string(),
                ts(&m.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_match(&self, id: Uuid) -> Result<MatchContext> {
        self.conn()
            .query_row(
                "SELECT id, user1_id, user2_id, created_at FROM matches WHERE id = ?1",
                params![id.to_string()],
                |r| {
                    Ok(MatchContext {
                        id: uuid_at(r, 0)?,
                        user1_id: uuid_at(r, 1)?,
                        user2_id: uuid_at(r, 2)?,
                        created_at: ts_at(r, 3)?,
                    })
                },
            )
            .map_err(StoreError::from_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_match, t0};

    #[test]
    fn insert_and_get_match() {
        let db = Database::open_in_memory().unwrap();
        let m = new_match(t0());
        db.insert_match(&m).unwrap();
        assert_eq!(db.get_match(m.id).unwrap(), m);
        assert!(db.get_match(Uuid::new_v4()).unwrap_err().is_not_found());
    }
}

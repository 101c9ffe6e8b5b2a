use callwire_shared::SdpType;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Offer;
use crate::row::{enum_at, ts, ts_at, uuid_at};

const OFFER_COLUMNS: &str = "id, call_id, from_user_id, to_user_id, sdp, sdp_type, created_at";

impl Database {
    pub fn insert_offer(&self, offer: &Offer) -> Result<Offer> {
        self.conn().execute(
            "INSERT INTO offers (id, call_id, from_user_id, to_user_id, sdp, sdp_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                offer.id.to_string(),
                offer.call_id.to_string(),
                offer.from_user_id.to_string(),
                offer.to_user_id.to_string(),
                offer.sdp,
                offer.sdp_type.as_str(),
                ts(&offer.created_at),
            ],
        )?;
        Ok(offer.clone())
    }

    /// The most recently inserted description of the given type for a call.
    pub fn latest_offer(&self, call_id: Uuid, sdp_type: SdpType) -> Result<Offer> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {OFFER_COLUMNS} FROM offers
                     WHERE call_id = ?1 AND sdp_type = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![call_id.to_string(), sdp_type.as_str()],
                row_to_offer,
            )
            .map_err(StoreError::from_query)
    }

}

fn row_to_offer(r: &rusqlite::Row<'_>) -> rusqlite::Result<Offer> {
    Ok(Offer {
        id: uuid_at(r, 0)?,
        call_id: uuid_at(r, 1)?,
        from_user_id: uuid_at(r, 2)?,
        to_user_id: uuid_at(r, 3)?,
        sdp: r.get(4)?,
        sdp_type: enum_at(r, 5)?,
        created_at: ts_at(r, 6)?,
    })
}

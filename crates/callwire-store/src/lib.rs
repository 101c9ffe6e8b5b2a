//! # callwire-store
//!
//! Durable call storage backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed insert/update/query helpers for
//! calls, connections, offers, ICE candidates and quality samples. Rows are
//! never deleted; call history is retained.

pub mod calls;
pub mod connections;
pub mod database;
pub mod ice_candidates;
pub mod matches;
pub mod migrations;
pub mod models;
pub mod offers;
pub mod quality;

mod error;
mod row;

pub use database::Database;
pub use error::{OptionalExt, Result, StoreError};
pub use models::*;

#[cfg(test)]
mod testutil;

//! One-shot migration from the legacy membership database.
//!
//! A [`LegacySource`] yields the legacy rows; the [`Reconciler`] maps them
//! onto roster records and upserts them into any
//! [`EntityStore`](roster_core::store::EntityStore) in dependency order.

mod reconcile;
mod source;
mod sqlite_source;

pub mod error;

pub use error::{Error, Result};
pub use reconcile::{ImportSummary, Reconciler};
pub use source::{
  ConnectionParams, LegacyMember, LegacyPerson, LegacySource, LegacyUser, LookupRow,
};
pub use sqlite_source::SqliteLegacySource;

#[cfg(test)]
mod tests;

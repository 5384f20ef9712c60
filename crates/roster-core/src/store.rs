//! The `EntityStore` trait.
//!
//! Implemented by storage backends (e.g. `roster-store-sqlite`). The
//! dispatch [`Service`](crate::service::Service) and the legacy importer
//! depend on this abstraction, never on a concrete backend.
//!
//! The store is deliberately dumb: it persists what it is given. Validation,
//! id assignment and system-managed fields happen before a record gets here.

use std::{collections::BTreeSet, future::Future};

use crate::{query::ListQuery, resource::ResourceKind, value::Record};

/// The rows of one page plus the size of the whole filtered set.
#[derive(Debug, Clone, Default)]
pub struct Listing {
  pub items:       Vec<Record>,
  pub total_items: u64,
}

/// Abstraction over a roster storage backend.
///
/// Every method is scoped to a single entity kind. All methods return `Send`
/// futures so the trait can be used from axum handlers.
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Execute a filtered, ordered, paged read.
  fn list<'a>(
    &'a self,
    kind: ResourceKind,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Listing, Self::Error>> + Send + 'a;

  /// Fetch one record. Returns `None` if there is no such id.
  fn find_by_id(
    &self,
    kind: ResourceKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Every id currently in use for `kind`.
  fn used_ids(
    &self,
    kind: ResourceKind,
  ) -> impl Future<Output = Result<BTreeSet<i64>, Self::Error>> + Send + '_;

  /// Insert a new record and return it as stored. When `record.id` is
  /// `None` the store picks the id.
  fn insert(
    &self,
    kind: ResourceKind,
    record: Record,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Overwrite only the fields present in `changes`. Returns `None` if
  /// there is no such id.
  fn update(
    &self,
    kind: ResourceKind,
    id: i64,
    changes: Record,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Insert `record` under its id, or overwrite the fields it carries if
  /// that id already exists. `record.id` must be set.
  fn upsert(
    &self,
    kind: ResourceKind,
    record: Record,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Delete one record. Dependent references are nulled (or, for logs of a
  /// member, deleted) by the backend. Returns `false` if there was no such
  /// id.
  fn delete(
    &self,
    kind: ResourceKind,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

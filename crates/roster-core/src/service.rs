//! The dispatch service: generic create / read / update / delete over any
//! [`ResourceKind`], backed by any [`EntityStore`].

use std::sync::Arc;

use serde_json::Value as Json;

use crate::{
  error::{Error, FieldErrors, Result},
  ids::{self, IdPolicy, IdRejection},
  lifecycle,
  payload::{self, Mode},
  query::{ListQuery, Page},
  resource::ResourceKind,
  schema::Schema,
  store::EntityStore,
  timestamp,
  value::{Record, Value},
};

/// Stateless request-scoped operations over a shared store handle.
///
/// The store is reference-counted; clones share it.
pub struct Service<S> {
  store:     Arc<S>,
  id_policy: IdPolicy,
}

impl<S> Clone for Service<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), id_policy: self.id_policy }
  }
}

impl<S: EntityStore> Service<S> {
  pub fn new(store: Arc<S>, id_policy: IdPolicy) -> Self { Self { store, id_policy } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn id_policy(&self) -> IdPolicy { self.id_policy }

  /// Filtered, ordered, paged read driven by raw query-string pairs.
  pub async fn list(
    &self,
    kind: ResourceKind,
    params: &[(String, String)],
  ) -> Result<Page<Record>> {
    let query = ListQuery::from_params(kind.schema(), params)?;
    tracing::debug!(%kind, ?query, "list");
    let listing = self.store.list(kind, &query).await.map_err(Error::store)?;
    Ok(Page::new(listing.items, listing.total_items, &query.page))
  }

  pub async fn get(&self, kind: ResourceKind, id: i64) -> Result<Record> {
    self
      .store
      .find_by_id(kind, id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound { kind, id })
  }

  pub async fn create(&self, kind: ResourceKind, body: &Json) -> Result<Record> {
    let schema = kind.schema();
    let mut record = payload::parse(schema, body, Mode::Create)?;

    let mut errors = FieldErrors::new();
    self.check_references(schema, &record, &mut errors).await?;

    if schema.client_ids {
      let used = self.store.used_ids(kind).await.map_err(Error::store)?;
      match ids::assign(self.id_policy, record.id, &used) {
        Ok(id) => record.id = Some(id),
        Err(IdRejection::Missing) => errors.add("id", "This field is required."),
        Err(IdRejection::Taken(id)) => {
          errors.add("id", format!("{kind} with this id ({id}) already exists."))
        }
        Err(IdRejection::Exhausted(id)) => {
          errors.add("id", format!("No free id at or above {id}."))
        }
      }
    } else {
      record.id = None;
    }
    let mut record = errors.into_result(record)?;

    lifecycle::on_create(kind, &mut record, timestamp::now());
    let stored = self.store.insert(kind, record).await.map_err(Error::store)?;
    tracing::debug!(%kind, id = ?stored.id, "created");
    Ok(stored)
  }

  /// Merge the supplied fields into an existing record.
  pub async fn update(
    &self,
    kind: ResourceKind,
    id: Option<&str>,
    body: &Json,
  ) -> Result<Record> {
    let id = require_id(id)?;
    let schema = kind.schema();
    let existing = self.get(kind, id).await?;

    let mut changes = payload::parse(schema, body, Mode::Partial)?;
    let mut errors = FieldErrors::new();
    self.check_references(schema, &changes, &mut errors).await?;
    errors.into_result(())?;

    lifecycle::on_update(kind, &existing, &mut changes, timestamp::now())?;
    let updated = self
      .store
      .update(kind, id, changes)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound { kind, id })?;
    tracing::debug!(%kind, id, "updated");
    Ok(updated)
  }

  pub async fn delete(&self, kind: ResourceKind, id: Option<&str>) -> Result<()> {
    let id = require_id(id)?;
    let deleted = self.store.delete(kind, id).await.map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound { kind, id });
    }
    tracing::debug!(%kind, id, "deleted");
    Ok(())
  }

  /// Every non-null reference must point at an existing record.
  async fn check_references(
    &self,
    schema: &Schema,
    record: &Record,
    errors: &mut FieldErrors,
  ) -> Result<()> {
    for (field, target) in schema.references() {
      let Some(Value::Integer(target_id)) = record.get(field.name) else {
        continue;
      };
      let found = self
        .store
        .find_by_id(target, *target_id)
        .await
        .map_err(Error::store)?;
      if found.is_none() {
        errors.add(
          field.name,
          format!("Invalid pk \"{target_id}\" - object does not exist."),
        );
      }
    }
    Ok(())
  }
}

/// Parse the `id` query parameter that update and delete require.
pub fn require_id(raw: Option<&str>) -> Result<i64> {
  let raw = raw.map(str::trim).filter(|s| !s.is_empty());
  let Some(raw) = raw else {
    return Err(Error::BadRequest("ID is required".into()));
  };
  raw
    .parse()
    .map_err(|_| Error::BadRequest(format!("Invalid id: {raw:?}")))
}

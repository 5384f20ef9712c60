//! The [`Reconciler`]: maps legacy rows onto roster records.
//!
//! Tables are imported in dependency order (lookups, users, persons,
//! members) and every row is upserted by its legacy id, so records written
//! earlier in a run are visible to later steps and a second run with the
//! same source leaves the store unchanged.
//!
//! A user's person is imported after the user itself. Users whose person
//! could not be resolved in the user pass are linked once persons exist.
//!
//! Rows without a positive legacy id are skipped and counted.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use roster_core::{
  Gender, Record, ResourceKind, Value,
  payload::normalize_decimal,
  schema::Schema,
  store::EntityStore,
  timestamp::{self, DatePart, TimePart},
};

use crate::{
  Error, Result,
  source::{LegacyMember, LegacyPerson, LegacySource, LegacyUser, LookupRow},
};

/// Rows upserted per table in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub shifts:           usize,
  pub roles:            usize,
  pub membership_types: usize,
  pub users:            usize,
  pub persons:          usize,
  pub members:          usize,
  /// Users linked to their person after the person pass.
  pub users_linked:     usize,
  /// Rows left out because their legacy id was missing or not positive.
  pub skipped:          usize,
}

/// Runs one import against a store.
pub struct Reconciler<'a, S> {
  store: &'a S,
}

impl<'a, S: EntityStore> Reconciler<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  pub async fn run<L: LegacySource>(&self, source: &L) -> Result<ImportSummary> {
    tracing::info!("legacy import started");
    let mut summary = ImportSummary::default();

    let shifts = source.shifts().await.map_err(Error::legacy)?;
    summary.shifts = self
      .lookups(ResourceKind::Shift, "shift_desc", shifts, &mut summary.skipped)
      .await?;

    let roles = source.roles().await.map_err(Error::legacy)?;
    summary.roles = self
      .lookups(ResourceKind::Role, "role_desc", roles, &mut summary.skipped)
      .await?;

    let types = source.membership_types().await.map_err(Error::legacy)?;
    summary.membership_types = self
      .lookups(
        ResourceKind::MembershipType,
        "membership_type_desc",
        types,
        &mut summary.skipped,
      )
      .await?;
    tracing::info!(
      shifts = summary.shifts,
      roles = summary.roles,
      membership_types = summary.membership_types,
      "lookup tables imported"
    );

    let users = source.users().await.map_err(Error::legacy)?;
    let mut unlinked = Vec::new();
    for row in &users {
      let Some(id) = legacy_id(ResourceKind::User, row.id) else {
        summary.skipped += 1;
        continue;
      };
      let record = self.user(id, row).await?;
      if let (Some(person_id), Some(Value::Null)) = (row.person_id, record.get("person")) {
        unlinked.push((id, person_id));
      }
      self.upsert(ResourceKind::User, record).await?;
      summary.users += 1;
    }
    tracing::info!(count = summary.users, "users imported");

    let persons = source.persons().await.map_err(Error::legacy)?;
    for row in &persons {
      let Some(id) = legacy_id(ResourceKind::Person, row.id) else {
        summary.skipped += 1;
        continue;
      };
      let record = self.person(id, row).await?;
      self.upsert(ResourceKind::Person, record).await?;
      summary.persons += 1;
    }
    tracing::info!(count = summary.persons, "persons imported");

    for (user_id, person_id) in unlinked {
      if !self.exists(ResourceKind::Person, person_id).await? {
        continue;
      }
      let link = Record::new().field("person", Value::Integer(person_id));
      self
        .store
        .update(ResourceKind::User, user_id, link)
        .await
        .map_err(Error::store)?;
      summary.users_linked += 1;
    }

    let members = source.members().await.map_err(Error::legacy)?;
    for row in &members {
      let Some(id) = legacy_id(ResourceKind::Member, row.id) else {
        summary.skipped += 1;
        continue;
      };
      let record = self.member(id, row).await?;
      self.upsert(ResourceKind::Member, record).await?;
      summary.members += 1;
    }
    tracing::info!(count = summary.members, "members imported");

    tracing::info!(?summary, "legacy import finished");
    Ok(summary)
  }

  async fn lookups(
    &self,
    kind: ResourceKind,
    field: &'static str,
    rows: Vec<LookupRow>,
    skipped: &mut usize,
  ) -> Result<usize> {
    let mut count = 0;
    for row in rows {
      let Some(id) = legacy_id(kind, row.id) else {
        *skipped += 1;
        continue;
      };
      let desc = row.desc.unwrap_or_default();
      let record = Record::with_id(id).field(field, Value::Text(desc));
      self.upsert(kind, record).await?;
      count += 1;
    }
    Ok(count)
  }

  async fn user(&self, id: i64, row: &LegacyUser) -> Result<Record> {
    let schema = ResourceKind::User.schema();
    Ok(
      Record::with_id(id)
        .field("person", self.resolve(ResourceKind::Person, row.person_id).await?)
        .field("username", Value::text(row.username.clone()))
        .field("password", Value::text(row.password.clone()))
        .field("is_admin", flag(schema, "is_admin", row.is_admin))
        .field("shift", self.resolve(ResourceKind::Shift, row.shift_id).await?)
        .field("is_active", flag(schema, "is_active", row.is_active))
        .field(
          "creation_datetime",
          Value::datetime(combine(
            ResourceKind::User,
            id,
            row.creation_date.as_ref(),
            row.creation_time.as_ref(),
          )),
        ),
    )
  }

  async fn person(&self, id: i64, row: &LegacyPerson) -> Result<Record> {
    let schema = ResourceKind::Person.schema();
    let text = |v: &Option<String>| Value::text(v.clone());
    Ok(
      Record::with_id(id)
        .field("first_name", text(&row.first_name))
        .field("last_name", text(&row.last_name))
        .field("full_name", text(&row.full_name))
        .field("father_name", text(&row.father_name))
        .field("gender", Value::Gender(Gender::from_legacy_code(row.gender)))
        .field("national_code", text(&row.national_code))
        .field("nidentity", text(&row.nidentity))
        .field("person_image", Value::blob(row.person_image.clone()))
        .field("thumbnail_image", Value::blob(row.thumbnail_image.clone()))
        .field("birth_date", text(&row.birth_date))
        .field("tel", text(&row.tel))
        .field("mobile", text(&row.mobile))
        .field("email", text(&row.email))
        .field("education", text(&row.education))
        .field("job", text(&row.job))
        .field("has_insurance", flag(schema, "has_insurance", row.has_insurance))
        .field("insurance_no", text(&row.insurance_no))
        .field("ins_start_date", text(&row.ins_start_date))
        .field("ins_end_date", text(&row.ins_end_date))
        .field("address", text(&row.address))
        .field("has_parrent", flag(schema, "has_parrent", row.has_parrent))
        .field("team_name", text(&row.team_name))
        .field("shift", self.resolve(ResourceKind::Shift, row.shift_id).await?)
        .field("user", self.resolve(ResourceKind::User, row.user_id).await?)
        .field(
          "creation_datetime",
          Value::datetime(combine(
            ResourceKind::Person,
            id,
            row.creation_date.as_ref(),
            row.creation_time.as_ref(),
          )),
        )
        .field("modifier", text(&row.modifier))
        .field("modification_datetime", non_empty(&row.modification_time)),
    )
  }

  async fn member(&self, id: i64, row: &LegacyMember) -> Result<Record> {
    let schema = ResourceKind::Member.schema();
    let blob = |v: &Option<Vec<u8>>| Value::blob(v.clone());
    let [face_1, face_2, face_3, face_4, face_5] = &row.face_templates;
    Ok(
      Record::with_id(id)
        .field("card_no", Value::text(row.card_no.clone()))
        .field("person", self.resolve(ResourceKind::Person, row.person_id).await?)
        .field("role", self.resolve(ResourceKind::Role, row.role_id).await?)
        .field("user", self.resolve(ResourceKind::User, row.user_id).await?)
        .field("shift", self.resolve(ResourceKind::Shift, row.shift_id).await?)
        .field("is_black_list", flag(schema, "is_black_list", row.is_black_list))
        .field("box_radif_no", Value::text(row.box_radif_no.clone()))
        .field("has_finger", flag(schema, "has_finger", row.has_finger))
        .field(
          "membership_datetime",
          Value::datetime(combine(
            ResourceKind::Member,
            id,
            row.membership_date.as_ref(),
            row.membership_time.as_ref(),
          )),
        )
        .field("modifier", Value::text(row.modifier.clone()))
        .field("modification_datetime", non_empty(&row.modification_time))
        .field("is_family", flag(schema, "is_family", row.is_family))
        .field("max_debit", money(id, "max_debit", row.max_debit))
        .field("minutiae", blob(&row.minutiae))
        .field("minutiae2", blob(&row.minutiae2))
        .field("minutiae3", blob(&row.minutiae3))
        .field("salary", money(id, "salary", row.salary))
        .field("face_template_1", blob(face_1))
        .field("face_template_2", blob(face_2))
        .field("face_template_3", blob(face_3))
        .field("face_template_4", blob(face_4))
        .field("face_template_5", blob(face_5)),
    )
  }

  /// Lookup-if-present: the reference if the target exists, else null.
  async fn resolve(&self, kind: ResourceKind, id: Option<i64>) -> Result<Value> {
    let Some(id) = id else {
      return Ok(Value::Null);
    };
    if self.exists(kind, id).await? {
      Ok(Value::Integer(id))
    } else {
      tracing::debug!(%kind, id, "legacy reference has no target");
      Ok(Value::Null)
    }
  }

  async fn exists(&self, kind: ResourceKind, id: i64) -> Result<bool> {
    let found = self.store.find_by_id(kind, id).await.map_err(Error::store)?;
    Ok(found.is_some())
  }

  async fn upsert(&self, kind: ResourceKind, record: Record) -> Result<()> {
    self.store.upsert(kind, record).await.map_err(Error::store)?;
    Ok(())
  }
}

// ─── Field mapping ───────────────────────────────────────────────────────────

/// The legacy primary key if it is usable as a roster id.
fn legacy_id(kind: ResourceKind, id: Option<i64>) -> Option<i64> {
  let usable = id.filter(|id| *id > 0);
  if usable.is_none() {
    tracing::warn!(%kind, ?id, "legacy row without a positive id skipped");
  }
  usable
}

/// A legacy flag, or the field's default when the legacy value is null.
fn flag(schema: &Schema, field: &str, value: Option<bool>) -> Value {
  let default = schema.field(field).and_then(|f| f.default);
  Value::boolean(value.or(default))
}

fn non_empty(value: &Option<String>) -> Value {
  Value::text(value.clone().filter(|s| !s.trim().is_empty()))
}

/// Rebuild a timestamp from its halves. A half that is present but
/// unparseable is logged; the field is null either way.
fn combine(
  kind: ResourceKind,
  id: i64,
  date: Option<&DatePart>,
  time: Option<&TimePart>,
) -> Option<NaiveDateTime> {
  let combined = timestamp::combine(date, time);
  if combined.is_none() && (date.is_some() || time.is_some()) {
    tracing::warn!(%kind, id, ?date, ?time, "unparseable legacy timestamp; left empty");
  }
  combined
}

/// Two-place decimal; out-of-range values are dropped with a warning.
fn money(id: i64, field: &'static str, value: Option<Decimal>) -> Value {
  let Some(value) = value else {
    return Value::Null;
  };
  let mut value = value.round_dp(2);
  match normalize_decimal(&mut value) {
    Ok(()) => Value::Decimal(value),
    Err(message) => {
      tracing::warn!(id, field, %message, "legacy amount dropped");
      Value::Null
    }
  }
}

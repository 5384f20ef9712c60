//! Typed field values and the [`Record`] that carries them.
//!
//! A record is schema-shaped: keys are the `&'static str` field names from a
//! [`Schema`](crate::schema::Schema), so only fields the schema knows about
//! can ever be stored.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use strum::{Display, EnumString};

// ─── Gender ──────────────────────────────────────────────────────────────────

/// Parses the full names and the one-letter codes (`M`, `F`, `O`) in any
/// case; always displays the full name.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
  #[strum(to_string = "Male", serialize = "M")]
  Male,
  #[strum(to_string = "Female", serialize = "F")]
  Female,
  #[strum(to_string = "Other", serialize = "O")]
  Other,
}

impl Gender {
  /// Map the legacy numeric code: `0` is female, `1` is male, anything else
  /// (including no value) is other.
  pub fn from_legacy_code(code: Option<i64>) -> Self {
    match code {
      Some(0) => Self::Female,
      Some(1) => Self::Male,
      _ => Self::Other,
    }
  }
}

// ─── Locker log ──────────────────────────────────────────────────────────────

/// One entry of a locker's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerLogEntry {
  pub full_name: Option<String>,
  pub datetime:  NaiveDateTime,
}

// ─── Value ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Text(String),
  Bool(bool),
  Decimal(Decimal),
  Date(NaiveDate),
  DateTime(NaiveDateTime),
  Blob(Vec<u8>),
  Gender(Gender),
  LockerLog(Vec<LockerLogEntry>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_datetime(&self) -> Option<NaiveDateTime> {
    match self {
      Self::DateTime(dt) => Some(*dt),
      _ => None,
    }
  }

  pub fn text(s: Option<String>) -> Self { s.map_or(Self::Null, Self::Text) }

  pub fn integer(i: Option<i64>) -> Self { i.map_or(Self::Null, Self::Integer) }

  pub fn boolean(b: Option<bool>) -> Self { b.map_or(Self::Null, Self::Bool) }

  pub fn decimal(d: Option<Decimal>) -> Self { d.map_or(Self::Null, Self::Decimal) }

  pub fn datetime(dt: Option<NaiveDateTime>) -> Self {
    dt.map_or(Self::Null, Self::DateTime)
  }

  pub fn blob(b: Option<Vec<u8>>) -> Self { b.map_or(Self::Null, Self::Blob) }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Null => s.serialize_none(),
      Self::Integer(i) => s.serialize_i64(*i),
      Self::Text(t) => s.serialize_str(t),
      Self::Bool(b) => s.serialize_bool(*b),
      Self::Decimal(d) => Serialize::serialize(d, s),
      Self::Date(d) => d.serialize(s),
      Self::DateTime(dt) => dt.serialize(s),
      Self::Blob(bytes) => s.serialize_str(&B64.encode(bytes)),
      Self::Gender(g) => s.serialize_str(&g.to_string()),
      Self::LockerLog(entries) => entries.serialize(s),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One row of any entity: an optional id plus named field values.
///
/// Serialises as a flat JSON object with `id` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
  pub id:     Option<i64>,
  pub values: BTreeMap<&'static str, Value>,
}

impl Record {
  pub fn new() -> Self { Self::default() }

  pub fn with_id(id: i64) -> Self { Self { id: Some(id), values: BTreeMap::new() } }

  pub fn get(&self, field: &str) -> Option<&Value> { self.values.get(field) }

  pub fn set(&mut self, field: &'static str, value: Value) {
    self.values.insert(field, value);
  }

  /// Builder-style [`Record::set`].
  pub fn field(mut self, field: &'static str, value: Value) -> Self {
    self.set(field, value);
    self
  }

  pub fn contains(&self, field: &str) -> bool { self.values.contains_key(field) }

  /// Overlay `changes` onto `self`; fields absent from `changes` are kept.
  pub fn merge(&mut self, changes: &Record) {
    for (field, value) in &changes.values {
      self.values.insert(field, value.clone());
    }
  }
}

impl Serialize for Record {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(self.values.len() + 1))?;
    map.serialize_entry("id", &self.id)?;
    for (field, value) in &self.values {
      map.serialize_entry(field, value)?;
    }
    map.end()
  }
}

//! Legacy row shapes and the [`LegacySource`] abstraction.
//!
//! Rows are carried as close to the legacy storage as possible: ids and
//! flags may be null and dates and times are separate halves.
//! Mapping onto roster records happens in the reconciler.

use std::future::Future;

use rust_decimal::Decimal;
use serde::Deserialize;

use roster_core::timestamp::{DatePart, TimePart};

use crate::{Error, Result};

// ─── Connection parameters ───────────────────────────────────────────────────

/// Where the legacy database lives, as posted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionParams {
  #[serde(rename = "SERVER", default)]
  pub server:   Option<String>,
  #[serde(rename = "DATABASE", default)]
  pub database: Option<String>,
}

impl ConnectionParams {
  pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
    Self { server: Some(server.into()), database: Some(database.into()) }
  }

  /// Both values, trimmed; either missing or blank is an error.
  pub fn require(&self) -> Result<(&str, &str)> {
    fn present(v: &Option<String>) -> Option<&str> {
      v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
    match (present(&self.server), present(&self.database)) {
      (Some(server), Some(database)) => Ok((server, database)),
      _ => Err(Error::MissingParams),
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A row of `Gen_Shift`, `Gen_PersonRole` or `Gen_MembershipType`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRow {
  pub id:   Option<i64>,
  pub desc: Option<String>,
}

/// A row of `Sec_Users`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyUser {
  pub id:            Option<i64>,
  pub person_id:     Option<i64>,
  pub username:      Option<String>,
  pub password:      Option<String>,
  pub is_admin:      Option<bool>,
  pub shift_id:      Option<i64>,
  pub is_active:     Option<bool>,
  pub creation_date: Option<DatePart>,
  pub creation_time: Option<TimePart>,
}

/// A row of `Gen_Person`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyPerson {
  pub id:                Option<i64>,
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub full_name:         Option<String>,
  pub father_name:       Option<String>,
  /// `0` female, `1` male, anything else other.
  pub gender:            Option<i64>,
  pub national_code:     Option<String>,
  pub nidentity:         Option<String>,
  pub person_image:      Option<Vec<u8>>,
  pub thumbnail_image:   Option<Vec<u8>>,
  pub birth_date:        Option<String>,
  pub tel:               Option<String>,
  pub mobile:            Option<String>,
  pub email:             Option<String>,
  pub education:         Option<String>,
  pub job:               Option<String>,
  pub has_insurance:     Option<bool>,
  pub insurance_no:      Option<String>,
  pub ins_start_date:    Option<String>,
  pub ins_end_date:      Option<String>,
  pub address:           Option<String>,
  pub has_parrent:       Option<bool>,
  pub team_name:         Option<String>,
  pub shift_id:          Option<i64>,
  pub user_id:           Option<i64>,
  pub creation_date:     Option<DatePart>,
  pub creation_time:     Option<TimePart>,
  pub modifier:          Option<String>,
  pub modification_time: Option<String>,
}

/// A row of `Gen_Members`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyMember {
  pub id:                Option<i64>,
  pub card_no:           Option<String>,
  pub person_id:         Option<i64>,
  pub role_id:           Option<i64>,
  pub user_id:           Option<i64>,
  pub shift_id:          Option<i64>,
  pub is_black_list:     Option<bool>,
  pub box_radif_no:      Option<String>,
  pub has_finger:        Option<bool>,
  pub membership_date:   Option<DatePart>,
  pub membership_time:   Option<TimePart>,
  pub modifier:          Option<String>,
  pub modification_time: Option<String>,
  pub is_family:         Option<bool>,
  pub max_debit:         Option<Decimal>,
  pub minutiae:          Option<Vec<u8>>,
  pub minutiae2:         Option<Vec<u8>>,
  pub minutiae3:         Option<Vec<u8>>,
  pub salary:            Option<Decimal>,
  pub face_templates:    [Option<Vec<u8>>; 5],
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Read access to the six legacy tables.
pub trait LegacySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn shifts(
    &self,
  ) -> impl Future<Output = Result<Vec<LookupRow>, Self::Error>> + Send + '_;

  fn roles(
    &self,
  ) -> impl Future<Output = Result<Vec<LookupRow>, Self::Error>> + Send + '_;

  fn membership_types(
    &self,
  ) -> impl Future<Output = Result<Vec<LookupRow>, Self::Error>> + Send + '_;

  fn users(
    &self,
  ) -> impl Future<Output = Result<Vec<LegacyUser>, Self::Error>> + Send + '_;

  fn persons(
    &self,
  ) -> impl Future<Output = Result<Vec<LegacyPerson>, Self::Error>> + Send + '_;

  fn members(
    &self,
  ) -> impl Future<Output = Result<Vec<LegacyMember>, Self::Error>> + Send + '_;
}

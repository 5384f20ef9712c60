//! The closed set of entity kinds the back office stores.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::schema::{self, Schema};

/// Every entity kind, named the way clients name them in `?action=`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
  Shift,
  Role,
  MembershipType,
  User,
  Person,
  Member,
  Locker,
  Log,
  Payment,
}

impl ResourceKind {
  /// Kinds reachable through the dynamic `?action=` endpoint.
  pub const DYNAMIC: [ResourceKind; 6] = [
    Self::Shift,
    Self::User,
    Self::Person,
    Self::Role,
    Self::Member,
    Self::MembershipType,
  ];

  /// Resolve an `action` query value. Only the dynamic kinds are accepted;
  /// lockers, logs and payments have endpoints of their own.
  pub fn from_action(action: &str) -> Option<Self> {
    let kind: Self = action.parse().ok()?;
    Self::DYNAMIC.contains(&kind).then_some(kind)
  }

  /// The static field table for this kind.
  pub fn schema(self) -> &'static Schema {
    match self {
      Self::Shift => &schema::SHIFT,
      Self::Role => &schema::ROLE,
      Self::MembershipType => &schema::MEMBERSHIP_TYPE,
      Self::User => &schema::USER,
      Self::Person => &schema::PERSON,
      Self::Member => &schema::MEMBER,
      Self::Locker => &schema::LOCKER,
      Self::Log => &schema::LOG,
      Self::Payment => &schema::PAYMENT,
    }
  }
}

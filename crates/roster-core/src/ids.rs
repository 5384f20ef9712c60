//! Primary-key assignment for kinds whose ids clients may choose.

use std::collections::BTreeSet;

use serde::Deserialize;

/// How `create` treats the `id` in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
  /// No id: take the smallest unused positive id. A taken id: walk upward
  /// to the first free one. Never a conflict.
  #[default]
  Reassign,
  /// The id is client data: it must be supplied and must be free.
  Client,
}

/// Why an id could not be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdRejection {
  Missing,
  Taken(i64),
  /// Every id from the requested one up to `i64::MAX` is taken.
  Exhausted(i64),
}

/// Smallest integer `>= start` (and `>= 1`) that is not in `used`, or
/// `None` if the walk would pass `i64::MAX`.
pub fn first_free_from(used: &BTreeSet<i64>, start: i64) -> Option<i64> {
  let mut candidate = start.max(1);
  for &id in used.range(candidate..) {
    if id != candidate {
      break;
    }
    candidate = candidate.checked_add(1)?;
  }
  Some(candidate)
}

/// Decide the id for a new record.
pub fn assign(
  policy: IdPolicy,
  requested: Option<i64>,
  used: &BTreeSet<i64>,
) -> Result<i64, IdRejection> {
  match (policy, requested) {
    (IdPolicy::Reassign, None) => first_free_from(used, 1).ok_or(IdRejection::Exhausted(1)),
    (IdPolicy::Reassign, Some(id)) => {
      first_free_from(used, id).ok_or(IdRejection::Exhausted(id))
    }
    (IdPolicy::Client, None) => Err(IdRejection::Missing),
    (IdPolicy::Client, Some(id)) if used.contains(&id) => Err(IdRejection::Taken(id)),
    (IdPolicy::Client, Some(id)) => Ok(id),
  }
}

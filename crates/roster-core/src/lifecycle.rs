//! System-managed fields applied on create and update.
//!
//! - `creation_datetime` on users and persons, `entry_time` on logs and
//!   `payment_date` on payments are set once, at creation.
//! - `Log.exit_time` is stamped the first time the log is saved offline and
//!   never changes afterwards.
//! - A locker's `log` only ever grows: an update must keep the stored
//!   entries as a prefix.

use chrono::NaiveDateTime;

use crate::{
  error::FieldErrors,
  resource::ResourceKind,
  value::{LockerLogEntry, Record, Value},
};

/// Fill system-managed fields on a record about to be inserted.
pub fn on_create(kind: ResourceKind, record: &mut Record, now: NaiveDateTime) {
  match kind {
    ResourceKind::User | ResourceKind::Person => {
      record.set("creation_datetime", Value::DateTime(now));
    }
    ResourceKind::Log => {
      record.set("entry_time", Value::DateTime(now));
      let online = record.get("is_online").and_then(Value::as_bool).unwrap_or(true);
      let exit = if online { Value::Null } else { Value::DateTime(now) };
      record.set("exit_time", exit);
    }
    ResourceKind::Payment => {
      record.set("payment_date", Value::Date(now.date()));
    }
    _ => {}
  }
}

/// Adjust `changes` against the stored record before an update is written.
pub fn on_update(
  kind: ResourceKind,
  existing: &Record,
  changes: &mut Record,
  now: NaiveDateTime,
) -> Result<(), FieldErrors> {
  match kind {
    ResourceKind::Log => {
      let already_exited =
        existing.get("exit_time").is_some_and(|v| !v.is_null());
      let online = changes
        .get("is_online")
        .or_else(|| existing.get("is_online"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
      if !already_exited && !online {
        changes.set("exit_time", Value::DateTime(now));
      }
      Ok(())
    }
    ResourceKind::Locker => check_log_append_only(existing, changes),
    _ => Ok(()),
  }
}

fn check_log_append_only(existing: &Record, changes: &Record) -> Result<(), FieldErrors> {
  let Some(incoming) = changes.get("log") else {
    return Ok(());
  };
  let stored: &[LockerLogEntry] = match existing.get("log") {
    Some(Value::LockerLog(entries)) => entries.as_slice(),
    _ => &[],
  };
  let incoming: &[LockerLogEntry] = match incoming {
    Value::LockerLog(entries) => entries.as_slice(),
    _ => &[],
  };

  let mut errors = FieldErrors::new();
  if !incoming.starts_with(stored) {
    errors.add("log", "Log entries are append-only; existing entries cannot change.");
  }
  errors.into_result(())
}

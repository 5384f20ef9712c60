//! Inbound JSON payload validation.
//!
//! [`parse`] turns a client JSON object into a [`Record`] by walking the
//! kind's [`Schema`]. Every problem is collected into [`FieldErrors`] rather
//! than stopping at the first one.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::{
  error::FieldErrors,
  schema::{Field, FieldType, Schema},
  timestamp::{parse_date, parse_datetime},
  value::{Gender, LockerLogEntry, Record, Value},
};

/// Largest absolute decimal accepted: ten digits, two of them fractional.
const DECIMAL_LIMIT: i64 = 100_000_000;

/// Whether a payload describes a whole new record or a partial change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Create,
  Partial,
}

/// Validate `body` against `schema`.
///
/// - Unknown keys are rejected; read-only keys are ignored.
/// - `id` is only read when the schema accepts client ids.
/// - In [`Mode::Create`], missing required fields are errors and omitted
///   boolean fields take their defaults.
pub fn parse(schema: &Schema, body: &Json, mode: Mode) -> Result<Record, FieldErrors> {
  let mut errors = FieldErrors::new();
  let Some(object) = body.as_object() else {
    errors.add("non_field_errors", "Invalid data. Expected a dictionary.");
    return Err(errors);
  };

  let mut record = Record::new();

  for (key, raw) in object {
    if key == "id" {
      if schema.client_ids && mode == Mode::Create {
        match parse_id(raw) {
          Ok(id) => record.id = id,
          Err(message) => errors.add("id", message),
        }
      }
      continue;
    }

    let Some(field) = schema.field(key) else {
      errors.add(key.as_str(), "Unknown field.");
      continue;
    };
    if field.read_only {
      continue;
    }

    match parse_value(field, raw) {
      Ok(value) => record.set(field.name, value),
      Err(message) => errors.add(field.name, message),
    }
  }

  if mode == Mode::Create {
    for field in schema.fields.iter().filter(|f| !f.read_only) {
      if record.contains(field.name) || errors.get(field.name).is_some() {
        continue;
      }
      if field.required {
        errors.add(field.name, "This field is required.");
      } else if let Some(default) = field.default {
        record.set(field.name, Value::Bool(default));
      } else {
        record.set(field.name, Value::Null);
      }
    }
  }

  errors.into_result(record)
}

/// Parse a client-supplied id. Absent, `null` and `""` all mean "assign one".
pub fn parse_id(raw: &Json) -> Result<Option<i64>, String> {
  let id = match raw {
    Json::Null => return Ok(None),
    Json::String(s) if s.trim().is_empty() => return Ok(None),
    Json::String(s) => s.trim().parse::<i64>().ok(),
    Json::Number(n) => n.as_i64(),
    _ => None,
  };
  match id {
    Some(id) if id >= 1 => Ok(Some(id)),
    Some(_) => Err("Ensure this value is greater than or equal to 1.".into()),
    None => Err("A valid integer is required.".into()),
  }
}

fn parse_value(field: &Field, raw: &Json) -> Result<Value, String> {
  if raw.is_null() {
    return if field.nullable {
      Ok(Value::Null)
    } else {
      Err("This field may not be null.".into())
    };
  }

  match field.ty {
    FieldType::Text => {
      let text = scalar_text(raw).ok_or("Not a valid string.")?;
      if field.required && text.trim().is_empty() {
        return Err("This field may not be blank.".into());
      }
      Ok(Value::Text(text))
    }
    FieldType::Email => {
      let text = scalar_text(raw).ok_or("Not a valid string.")?;
      if text.is_empty() {
        return Ok(Value::Null);
      }
      if !looks_like_email(&text) {
        return Err("Enter a valid email address.".into());
      }
      Ok(Value::Text(text))
    }
    FieldType::Integer => json_i64(raw)
      .map(Value::Integer)
      .ok_or_else(|| "A valid integer is required.".into()),
    FieldType::Bool => json_bool(raw)
      .map(Value::Bool)
      .ok_or_else(|| "Must be a valid boolean.".into()),
    FieldType::Decimal => json_decimal(raw).map(Value::Decimal),
    FieldType::Date => raw
      .as_str()
      .and_then(parse_date)
      .map(Value::Date)
      .ok_or_else(|| "Date has wrong format. Use YYYY-MM-DD.".into()),
    FieldType::DateTime => raw
      .as_str()
      .and_then(parse_datetime)
      .map(Value::DateTime)
      .ok_or_else(|| "Datetime has wrong format.".into()),
    FieldType::Blob => {
      let text = raw.as_str().ok_or("Invalid base64-encoded data.")?;
      B64
        .decode(text.trim())
        .map(Value::Blob)
        .map_err(|_| "Invalid base64-encoded data.".into())
    }
    FieldType::Gender => raw
      .as_str()
      .and_then(|s| s.parse::<Gender>().ok())
      .map(Value::Gender)
      .ok_or_else(|| format!("\"{}\" is not a valid choice.", display_raw(raw))),
    FieldType::Reference(_) => match json_i64(raw) {
      Some(id) if id >= 1 => Ok(Value::Integer(id)),
      _ => Err(format!(
        "Incorrect type. Expected pk value, received {}.",
        display_raw(raw)
      )),
    },
    FieldType::LockerLog => parse_locker_log(raw).map(Value::LockerLog),
  }
}

fn parse_locker_log(raw: &Json) -> Result<Vec<LockerLogEntry>, String> {
  let entries = raw.as_array().ok_or("Expected a list of log entries.")?;
  entries
    .iter()
    .enumerate()
    .map(|(i, entry)| {
      let datetime = entry
        .get("datetime")
        .and_then(Json::as_str)
        .and_then(parse_datetime)
        .ok_or_else(|| format!("Entry {i}: datetime is missing or malformed."))?;
      let full_name = match entry.get("full_name") {
        None | Some(Json::Null) => None,
        Some(Json::String(s)) => Some(s.clone()),
        Some(_) => return Err(format!("Entry {i}: full_name must be a string.")),
      };
      Ok(LockerLogEntry { full_name, datetime })
    })
    .collect()
}

fn scalar_text(raw: &Json) -> Option<String> {
  match raw {
    Json::String(s) => Some(s.clone()),
    Json::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn json_i64(raw: &Json) -> Option<i64> {
  match raw {
    Json::Number(n) => n.as_i64(),
    Json::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn json_bool(raw: &Json) -> Option<bool> {
  match raw {
    Json::Bool(b) => Some(*b),
    Json::Number(n) => match n.as_i64() {
      Some(0) => Some(false),
      Some(1) => Some(true),
      _ => None,
    },
    Json::String(s) => parse_bool(s),
    _ => None,
  }
}

/// Boolean spellings accepted in payloads and query strings.
pub fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Some(true),
    "false" | "0" | "no" | "off" => Some(false),
    _ => None,
  }
}

fn json_decimal(raw: &Json) -> Result<Decimal, String> {
  let parsed = match raw {
    Json::Number(n) => n.to_string().parse::<Decimal>().ok(),
    Json::String(s) => s.trim().parse::<Decimal>().ok(),
    _ => None,
  };
  let mut value = parsed.ok_or("A valid number is required.")?;
  normalize_decimal(&mut value)?;
  Ok(value)
}

/// Force two decimal places, rejecting values that would lose precision or
/// exceed ten digits.
pub fn normalize_decimal(value: &mut Decimal) -> Result<(), String> {
  if value.normalize().scale() > 2 {
    return Err("Ensure that there are no more than 2 decimal places.".into());
  }
  if value.abs() >= Decimal::from(DECIMAL_LIMIT) {
    return Err("Ensure that there are no more than 10 digits in total.".into());
  }
  value.rescale(2);
  Ok(())
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.starts_with('.')
        && domain.contains('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
    }
    None => false,
  }
}

fn display_raw(raw: &Json) -> String {
  match raw {
    Json::String(s) => s.clone(),
    other => other.to_string(),
  }
}

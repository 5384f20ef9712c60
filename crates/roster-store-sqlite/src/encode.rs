//! Encoding and decoding between [`roster_core::Value`] and the SQLite
//! column representations.
//!
//! Booleans are stored as `0`/`1`. Decimals are stored as text already
//! rescaled to two places, so equality filters compare exactly. Dates use
//! `YYYY-MM-DD`, datetimes ISO 8601 with optional fractional seconds. Genders
//! are stored by full name and the locker log as compact JSON.

use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;
use rust_decimal::Decimal;

use roster_core::{
  Gender, Record, Value,
  schema::{Field, FieldType, Schema},
  timestamp::{DATE_FORMAT, parse_date, parse_datetime},
  value::LockerLogEntry,
};

use crate::{Error, Result};

/// Storage format for datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ─── Encode ──────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: NaiveDateTime) -> String { dt.format(DATETIME_FORMAT).to_string() }

/// Convert a field value to an owned SQLite value.
pub fn encode_value(value: &Value) -> Result<SqlValue> {
  Ok(match value {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Decimal(d) => SqlValue::Text(d.to_string()),
    Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
    Value::DateTime(dt) => SqlValue::Text(encode_dt(*dt)),
    Value::Blob(bytes) => SqlValue::Blob(bytes.clone()),
    Value::Gender(g) => SqlValue::Text(g.to_string()),
    Value::LockerLog(entries) => SqlValue::Text(serde_json::to_string(entries)?),
  })
}

/// The `(column, value)` pairs for every field present in `record`, in
/// schema order.
pub fn encode_columns(schema: &Schema, record: &Record) -> Result<Vec<(&'static str, SqlValue)>> {
  schema
    .fields
    .iter()
    .filter_map(|f| record.get(f.name).map(|v| (f.column, v)))
    .map(|(column, value)| Ok((column, encode_value(value)?)))
    .collect()
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A row as read inside the connection closure: the id followed by one
/// column per schema field, undecoded.
pub struct RawRow {
  pub id:      i64,
  pub columns: Vec<SqlValue>,
}

impl RawRow {
  pub fn from_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Self> {
    let id = row.get(0)?;
    let columns = (1..=width).map(|i| row.get(i)).collect::<rusqlite::Result<_>>()?;
    Ok(Self { id, columns })
  }

  pub fn decode(self, schema: &Schema) -> Result<Record> {
    let mut record = Record::with_id(self.id);
    for (field, raw) in schema.fields.iter().zip(self.columns) {
      record.set(field.name, decode_value(schema, field, raw)?);
    }
    Ok(record)
  }
}

// ─── Decode ──────────────────────────────────────────────────────────────────

fn decode_value(schema: &Schema, field: &Field, raw: SqlValue) -> Result<Value> {
  let fail = |message: String| Error::Decode {
    table: schema.table,
    column: field.column,
    message,
  };
  let mismatch = |raw: &SqlValue| fail(format!("unexpected {:?}", raw.data_type()));

  if raw == SqlValue::Null {
    return Ok(Value::Null);
  }

  let value = match (field.ty, raw) {
    (FieldType::Integer | FieldType::Reference(_), SqlValue::Integer(i)) => {
      Value::Integer(i)
    }
    (FieldType::Text | FieldType::Email, SqlValue::Text(s)) => Value::Text(s),
    (FieldType::Text | FieldType::Email, SqlValue::Integer(i)) => Value::Text(i.to_string()),
    (FieldType::Bool, SqlValue::Integer(i)) => Value::Bool(i != 0),
    (FieldType::Decimal, SqlValue::Text(s)) => {
      let mut d: Decimal = s.parse().map_err(|e| fail(format!("{e}")))?;
      d.rescale(2);
      Value::Decimal(d)
    }
    (FieldType::Decimal, SqlValue::Integer(i)) => {
      let mut d = Decimal::from(i);
      d.rescale(2);
      Value::Decimal(d)
    }
    (FieldType::Date, SqlValue::Text(s)) => {
      Value::Date(parse_date(&s).ok_or_else(|| fail(format!("bad date {s:?}")))?)
    }
    (FieldType::DateTime, SqlValue::Text(s)) => Value::DateTime(
      parse_datetime(&s).ok_or_else(|| fail(format!("bad datetime {s:?}")))?,
    ),
    (FieldType::Blob, SqlValue::Blob(bytes)) => Value::Blob(bytes),
    (FieldType::Gender, SqlValue::Text(s)) => Value::Gender(
      s.parse::<Gender>().map_err(|_| fail(format!("bad gender {s:?}")))?,
    ),
    (FieldType::LockerLog, SqlValue::Text(s)) => {
      Value::LockerLog(serde_json::from_str::<Vec<LockerLogEntry>>(&s)?)
    }
    (_, other) => return Err(mismatch(&other)),
  };
  Ok(value)
}

//! The filter / order / paginate engine.
//!
//! [`ListQuery::from_params`] turns raw query-string pairs into a validated,
//! backend-neutral query. Execution is left to the store.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
  error::{Error, Result},
  payload::{normalize_decimal, parse_bool},
  schema::{Field, FieldType, Match, Schema},
  timestamp::{parse_date, parse_datetime},
  value::{Gender, Value},
};

/// Control keys that are never treated as field filters.
pub const RESERVED_PARAMS: [&str; 5] = ["action", "id", "page", "limit", "order_by"];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

// ─── Predicates ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  Eq,
  /// Case-insensitive substring; the value is always [`Value::Text`].
  Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub column: &'static str,
  pub op:     Op,
  pub value:  Value,
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
  /// Ascending id.
  #[default]
  Natural,
  /// Recency column, newest first.
  Latest,
  /// Recency column, oldest first.
  Earlier,
}

impl Order {
  /// `latest` and `earlier` are recognised; anything else is natural order.
  pub fn from_param(value: Option<&str>) -> Self {
    match value {
      Some("latest") => Self::Latest,
      Some("earlier") => Self::Earlier,
      _ => Self::Natural,
    }
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  /// 1-based.
  pub page:  u64,
  pub limit: u64,
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT } }
}

impl PageRequest {
  /// Parse `page` and `limit`; both must be positive integers when present.
  pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Result<Self> {
    let parse = |raw: Option<&str>, default: u64| -> Result<u64> {
      match raw {
        None => Ok(default),
        Some(s) => match s.trim().parse::<u64>() {
          Ok(n) if n >= 1 => Ok(n),
          _ => Err(Error::BadRequest("Invalid pagination parameters".into())),
        },
      }
    };
    Ok(Self { page: parse(page, DEFAULT_PAGE)?, limit: parse(limit, DEFAULT_LIMIT)? })
  }

  pub fn offset(&self) -> u64 { (self.page - 1).saturating_mul(self.limit) }

  pub fn total_pages(&self, total_items: u64) -> u64 { total_items.div_ceil(self.limit) }
}

/// One page of results plus the counts clients need to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub total_items:  u64,
  pub total_pages:  u64,
  pub current_page: u64,
  pub items:        Vec<T>,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, total_items: u64, request: &PageRequest) -> Self {
    Self {
      total_items,
      total_pages: request.total_pages(total_items),
      current_page: request.page,
      items,
    }
  }

  pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      total_items:  self.total_items,
      total_pages:  self.total_pages,
      current_page: self.current_page,
      items:        self.items.into_iter().map(f).collect(),
    }
  }
}

// ─── ListQuery ───────────────────────────────────────────────────────────────

/// A validated read request against one entity kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
  pub id:         Option<i64>,
  /// Conjunction; every predicate must hold.
  pub predicates: Vec<Predicate>,
  pub order:      Order,
  /// Column that `order` sorts on when not natural.
  pub recency:    &'static str,
  pub page:       PageRequest,
}

impl ListQuery {
  /// An unfiltered query for `schema` with default paging.
  pub fn all(schema: &Schema) -> Self {
    Self { recency: schema.recency, ..Self::default() }
  }

  /// Build a query from raw `key=value` pairs.
  pub fn from_params(schema: &Schema, params: &[(String, String)]) -> Result<Self> {
    let lookup = |key: &str| {
      params.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    };

    let id = match lookup("id").map(str::trim) {
      None | Some("") => None,
      Some(raw) => Some(
        raw
          .parse::<i64>()
          .map_err(|_| Error::BadRequest(format!("Invalid id: {raw:?}")))?,
      ),
    };

    let mut predicates = Vec::new();
    for (key, raw) in params {
      if RESERVED_PARAMS.contains(&key.as_str()) {
        continue;
      }
      let field = schema.field(key).ok_or_else(|| {
        Error::BadRequest(format!("Unknown filter field: {key:?}"))
      })?;
      predicates.push(predicate(field, raw)?);
    }

    Ok(Self {
      id,
      predicates,
      order: Order::from_param(lookup("order_by")),
      recency: schema.recency,
      page: PageRequest::from_params(lookup("page"), lookup("limit"))?,
    })
  }
}

fn predicate(field: &'static Field, raw: &str) -> Result<Predicate> {
  let bad = || Error::BadRequest(format!("Invalid value for {}: {raw:?}", field.name));
  let op = match field.matching {
    Match::Never => {
      return Err(Error::BadRequest(format!(
        "Field {:?} cannot be filtered",
        field.name
      )));
    }
    Match::Contains => Op::Contains,
    Match::Exact => Op::Eq,
  };

  let value = if op == Op::Contains {
    Value::Text(raw.to_owned())
  } else {
    filter_value(field.ty, raw).ok_or_else(bad)?
  };

  Ok(Predicate { column: field.column, op, value })
}

/// Parse a query-string value to the field's scalar type.
fn filter_value(ty: FieldType, raw: &str) -> Option<Value> {
  let trimmed = raw.trim();
  match ty {
    FieldType::Text | FieldType::Email => Some(Value::Text(raw.to_owned())),
    FieldType::Integer | FieldType::Reference(_) => {
      trimmed.parse().ok().map(Value::Integer)
    }
    FieldType::Bool => parse_bool(trimmed).map(Value::Bool),
    FieldType::Decimal => {
      let mut d: Decimal = trimmed.parse().ok()?;
      normalize_decimal(&mut d).ok()?;
      Some(Value::Decimal(d))
    }
    FieldType::Date => parse_date(trimmed).map(Value::Date),
    FieldType::DateTime => parse_datetime(trimmed).map(Value::DateTime),
    FieldType::Gender => trimmed.parse::<Gender>().ok().map(Value::Gender),
    FieldType::Blob | FieldType::LockerLog => None,
  }
}

//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::{collections::BTreeSet, path::Path};

use rusqlite::{
  OptionalExtension as _, functions::FunctionFlags, params_from_iter,
  types::Value as SqlValue,
};

use roster_core::{
  Record, ResourceKind,
  query::{ListQuery, Op, Order},
  schema::Schema,
  store::{EntityStore, Listing},
};

use crate::{
  Error, Result,
  encode::{RawRow, encode_columns, encode_value},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_fold(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read one row by id on an already-borrowed connection.
  fn select_one(
    conn: &rusqlite::Connection,
    schema: &Schema,
    id: i64,
  ) -> rusqlite::Result<Option<RawRow>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", select_list(schema), schema.table);
    conn
      .query_row(&sql, [id], |row| RawRow::from_row(row, schema.fields.len()))
      .optional()
  }
}

/// `fold(text)`: Unicode lower-casing for substring filters. SQLite's own
/// `lower()` only folds ASCII. Non-text values pass through.
fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| match ctx.get::<SqlValue>(0)? {
      SqlValue::Text(text) => Ok(SqlValue::Text(text.to_lowercase())),
      other => Ok(other),
    },
  )
}

/// `id` followed by every schema column, in schema order.
fn select_list(schema: &Schema) -> String {
  std::iter::once("id")
    .chain(schema.fields.iter().map(|f| f.column))
    .collect::<Vec<_>>()
    .join(", ")
}

/// `WHERE` clause and bound parameters for a list query.
fn where_clause(query: &ListQuery) -> Result<(String, Vec<SqlValue>)> {
  let mut clauses = Vec::new();
  let mut params = Vec::new();

  if let Some(id) = query.id {
    params.push(SqlValue::Integer(id));
    clauses.push(format!("id = ?{}", params.len()));
  }
  for predicate in &query.predicates {
    params.push(encode_value(&predicate.value)?);
    let n = params.len();
    clauses.push(match predicate.op {
      Op::Eq => format!("{} = ?{n}", predicate.column),
      Op::Contains => format!("instr(fold({}), fold(?{n})) > 0", predicate.column),
    });
  }

  let sql = if clauses.is_empty() {
    String::new()
  } else {
    format!(" WHERE {}", clauses.join(" AND "))
  };
  Ok((sql, params))
}

fn order_clause(query: &ListQuery) -> String {
  match query.order {
    Order::Natural => " ORDER BY id ASC".to_owned(),
    Order::Latest => format!(" ORDER BY {} DESC, id DESC", query.recency),
    Order::Earlier => format!(" ORDER BY {} ASC, id ASC", query.recency),
  }
}

fn clamp(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<Listing> {
    let schema = kind.schema();
    let (filter, mut params) = where_clause(query)?;
    let count_sql = format!("SELECT COUNT(*) FROM {}{filter}", schema.table);
    let select_sql = format!(
      "SELECT {} FROM {}{filter}{} LIMIT ?{} OFFSET ?{}",
      select_list(schema),
      schema.table,
      order_clause(query),
      params.len() + 1,
      params.len() + 2,
    );
    let filter_params = params.clone();
    params.push(SqlValue::Integer(clamp(query.page.limit)));
    params.push(SqlValue::Integer(clamp(query.page.offset())));
    let width = schema.fields.len();

    let (total, raw_rows): (i64, Vec<RawRow>) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row(&count_sql, params_from_iter(filter_params), |r| r.get(0))?;
        let mut stmt = conn.prepare(&select_sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), |row| RawRow::from_row(row, width))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, rows))
      })
      .await?;

    let items = raw_rows
      .into_iter()
      .map(|raw| raw.decode(schema))
      .collect::<Result<Vec<_>>>()?;
    Ok(Listing { items, total_items: u64::try_from(total).unwrap_or(0) })
  }

  async fn find_by_id(&self, kind: ResourceKind, id: i64) -> Result<Option<Record>> {
    let schema = kind.schema();
    let raw = self
      .conn
      .call(move |conn| Ok(Self::select_one(conn, schema, id)?))
      .await?;
    raw.map(|raw| raw.decode(schema)).transpose()
  }

  async fn used_ids(&self, kind: ResourceKind) -> Result<BTreeSet<i64>> {
    let sql = format!("SELECT id FROM {}", kind.schema().table);
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
          .query_map([], |r| r.get::<_, i64>(0))?
          .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record> {
    let schema = kind.schema();
    let mut columns = encode_columns(schema, &record)?;
    if let Some(id) = record.id {
      columns.insert(0, ("id", SqlValue::Integer(id)));
    }

    let sql = if columns.is_empty() {
      format!("INSERT INTO {} DEFAULT VALUES", schema.table)
    } else {
      let names = columns.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ");
      let slots = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
      format!("INSERT INTO {} ({names}) VALUES ({slots})", schema.table)
    };
    let values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(&sql, params_from_iter(values))?;
        let id = conn.last_insert_rowid();
        Ok(Self::select_one(conn, schema, id)?)
      })
      .await?;

    let stored = raw
      .ok_or_else(|| Error::Database(rusqlite::Error::QueryReturnedNoRows.into()))?
      .decode(schema)?;
    tracing::trace!(table = schema.table, id = ?stored.id, "inserted");
    Ok(stored)
  }

  async fn update(
    &self,
    kind: ResourceKind,
    id: i64,
    changes: Record,
  ) -> Result<Option<Record>> {
    let schema = kind.schema();
    let columns = encode_columns(schema, &changes)?;

    let sql = (!columns.is_empty()).then(|| {
      let sets = columns
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{c} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
      format!("UPDATE {} SET {sets} WHERE id = ?{}", schema.table, columns.len() + 1)
    });
    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::Integer(id));

    let raw = self
      .conn
      .call(move |conn| {
        if let Some(sql) = sql {
          conn.execute(&sql, params_from_iter(values))?;
        }
        Ok(Self::select_one(conn, schema, id)?)
      })
      .await?;
    raw.map(|raw| raw.decode(schema)).transpose()
  }

  async fn upsert(&self, kind: ResourceKind, record: Record) -> Result<Record> {
    let schema = kind.schema();
    let id = record.id.ok_or(Error::MissingId(kind))?;
    let columns = encode_columns(schema, &record)?;

    let names = std::iter::once("id")
      .chain(columns.iter().map(|(c, _)| *c))
      .collect::<Vec<_>>()
      .join(", ");
    let slots = (1..=columns.len() + 1)
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let conflict = if columns.is_empty() {
      "DO NOTHING".to_owned()
    } else {
      let sets = columns
        .iter()
        .map(|(c, _)| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
      format!("DO UPDATE SET {sets}")
    };
    let sql = format!(
      "INSERT INTO {} ({names}) VALUES ({slots}) ON CONFLICT(id) {conflict}",
      schema.table
    );
    let values: Vec<SqlValue> = std::iter::once(SqlValue::Integer(id))
      .chain(columns.into_iter().map(|(_, v)| v))
      .collect();

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(&sql, params_from_iter(values))?;
        Ok(Self::select_one(conn, schema, id)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::Database(rusqlite::Error::QueryReturnedNoRows.into()))?
      .decode(schema)
  }

  async fn delete(&self, kind: ResourceKind, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", kind.schema().table);
    let affected = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, [id])?))
      .await?;
    Ok(affected > 0)
  }
}

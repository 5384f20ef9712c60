//! [`SqliteLegacySource`] reads the legacy tables from a SQLite file.
//!
//! The file is opened read-only. Column affinities in legacy exports are
//! unreliable, so every column is read as a dynamic value and coerced.

use std::path::{Component, Path, PathBuf};

use rusqlite::{OpenFlags, types::Value as SqlValue};
use rust_decimal::Decimal;

use roster_core::timestamp::{DatePart, TimePart};

use crate::{
  Error, Result,
  source::{ConnectionParams, LegacyMember, LegacyPerson, LegacySource, LegacyUser, LookupRow},
};

/// A read-only handle on a legacy SQLite database.
#[derive(Clone)]
pub struct SqliteLegacySource {
  conn: tokio_rusqlite::Connection,
}

impl SqliteLegacySource {
  /// Open the legacy database at `path`. The file must already exist.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(Error::DatabaseNotFound(path.to_path_buf()));
    }
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = tokio_rusqlite::Connection::open_with_flags(path, flags).await?;
    Ok(Self { conn })
  }

  /// Resolve `SERVER`/`DATABASE` to a file and open it.
  pub async fn connect(root: Option<&Path>, params: &ConnectionParams) -> Result<Self> {
    let path = resolve(root, params)?;
    tracing::info!(path = %path.display(), "opening legacy database");
    Self::open(path).await
  }

  async fn rows<T, F>(&self, sql: &'static str, map: F) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: Fn(&[SqlValue]) -> T + Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt
          .query_map([], |row| {
            let values = (0..width)
              .map(|i| row.get::<_, SqlValue>(i))
              .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(map(&values))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

/// `<root>/<server>/<database>`, or `<server>/<database>` without a root.
///
/// Under a root, both parts must be plain relative names.
pub fn resolve(root: Option<&Path>, params: &ConnectionParams) -> Result<PathBuf> {
  let (server, database) = params.require()?;
  let relative = Path::new(server).join(database);
  match root {
    None => Ok(relative),
    Some(root) => {
      let plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
      if !plain {
        return Err(Error::InvalidLocation(relative.display().to_string()));
      }
      Ok(root.join(relative))
    }
  }
}

// ─── Coercion ────────────────────────────────────────────────────────────────

fn text(v: &SqlValue) -> Option<String> {
  match v {
    SqlValue::Text(s) => Some(s.clone()),
    SqlValue::Integer(i) => Some(i.to_string()),
    SqlValue::Real(f) => Some(f.to_string()),
    SqlValue::Blob(_) | SqlValue::Null => None,
  }
}

/// Ids of `0` and below are treated as absent.
fn id(v: &SqlValue) -> Option<i64> {
  let id = match v {
    SqlValue::Integer(i) => Some(*i),
    SqlValue::Text(s) => s.trim().parse().ok(),
    _ => None,
  };
  id.filter(|i| *i > 0)
}

fn int(v: &SqlValue) -> Option<i64> {
  match v {
    SqlValue::Integer(i) => Some(*i),
    SqlValue::Text(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn flag(v: &SqlValue) -> Option<bool> {
  match v {
    SqlValue::Integer(i) => Some(*i != 0),
    SqlValue::Text(s) => roster_core::payload::parse_bool(s),
    _ => None,
  }
}

fn bytes(v: &SqlValue) -> Option<Vec<u8>> {
  match v {
    SqlValue::Blob(b) => Some(b.clone()),
    _ => None,
  }
}

fn decimal(v: &SqlValue) -> Option<Decimal> {
  match v {
    SqlValue::Integer(i) => Some(Decimal::from(*i)),
    SqlValue::Real(f) => Decimal::from_f64_retain(*f),
    SqlValue::Text(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn date(v: &SqlValue) -> Option<DatePart> { text(v).map(DatePart::Text) }

fn time(v: &SqlValue) -> Option<TimePart> { text(v).map(TimePart::Text) }

fn lookup(row: &[SqlValue]) -> LookupRow {
  LookupRow { id: id(&row[0]), desc: text(&row[1]) }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

const USERS: &str = "
SELECT UserID, PersonID, UserName, UPassword, IsAdmin, ShiftID,
       IsActive, CreationDate, CreationTime
FROM Sec_Users";

const PERSONS: &str = "
SELECT PersonID, FirstName, LastName, FullName, FatherName, Gender, NationalCode,
       Nidentity, PersonImage, ThumbnailImage, BirthDate, Tel, Mobile, Email,
       Education, Job, HasInsurance, InsuranceNo, InsStartDate, InsEndDate, PAddress,
       HasParrent, TeamName, ShiftID, UserID, CreationDate, CreationTime, Modifier,
       ModificationTime
FROM Gen_Person";

const MEMBERS: &str = "
SELECT MemberID, CardNo, PersonID, RoleID, UserID, ShiftID,
       IsBlackList, BoxRadifNo, HasFinger, MembershipDate, MembershipTime,
       Modifier, Modificationtime, IsFamily, MaxDebit, Minutiae,
       Minutiae2, Minutiae3, Salary, FaceTmpl1, FaceTmpl2, FaceTmpl3,
       FaceTmpl4, FaceTmpl5
FROM Gen_Members";

// ─── LegacySource impl ───────────────────────────────────────────────────────

impl LegacySource for SqliteLegacySource {
  type Error = Error;

  async fn shifts(&self) -> Result<Vec<LookupRow>> {
    self.rows("SELECT ShiftID, ShiftDesc FROM Gen_Shift", lookup).await
  }

  async fn roles(&self) -> Result<Vec<LookupRow>> {
    self.rows("SELECT RoleID, RoleDesc FROM Gen_PersonRole", lookup).await
  }

  async fn membership_types(&self) -> Result<Vec<LookupRow>> {
    self
      .rows("SELECT MembershipTypeID, MembershipTypeDesc FROM Gen_MembershipType", lookup)
      .await
  }

  async fn users(&self) -> Result<Vec<LegacyUser>> {
    self
      .rows(USERS, |r| LegacyUser {
        id:            id(&r[0]),
        person_id:     id(&r[1]),
        username:      text(&r[2]),
        password:      text(&r[3]),
        is_admin:      flag(&r[4]),
        shift_id:      id(&r[5]),
        is_active:     flag(&r[6]),
        creation_date: date(&r[7]),
        creation_time: time(&r[8]),
      })
      .await
  }

  async fn persons(&self) -> Result<Vec<LegacyPerson>> {
    self
      .rows(PERSONS, |r| LegacyPerson {
        id:                id(&r[0]),
        first_name:        text(&r[1]),
        last_name:         text(&r[2]),
        full_name:         text(&r[3]),
        father_name:       text(&r[4]),
        gender:            int(&r[5]),
        national_code:     text(&r[6]),
        nidentity:         text(&r[7]),
        person_image:      bytes(&r[8]),
        thumbnail_image:   bytes(&r[9]),
        birth_date:        text(&r[10]),
        tel:               text(&r[11]),
        mobile:            text(&r[12]),
        email:             text(&r[13]),
        education:         text(&r[14]),
        job:               text(&r[15]),
        has_insurance:     flag(&r[16]),
        insurance_no:      text(&r[17]),
        ins_start_date:    text(&r[18]),
        ins_end_date:      text(&r[19]),
        address:           text(&r[20]),
        has_parrent:       flag(&r[21]),
        team_name:         text(&r[22]),
        shift_id:          id(&r[23]),
        user_id:           id(&r[24]),
        creation_date:     date(&r[25]),
        creation_time:     time(&r[26]),
        modifier:          text(&r[27]),
        modification_time: text(&r[28]),
      })
      .await
  }

  async fn members(&self) -> Result<Vec<LegacyMember>> {
    self
      .rows(MEMBERS, |r| LegacyMember {
        id:                id(&r[0]),
        card_no:           text(&r[1]),
        person_id:         id(&r[2]),
        role_id:           id(&r[3]),
        user_id:           id(&r[4]),
        shift_id:          id(&r[5]),
        is_black_list:     flag(&r[6]),
        box_radif_no:      text(&r[7]),
        has_finger:        flag(&r[8]),
        membership_date:   date(&r[9]),
        membership_time:   time(&r[10]),
        modifier:          text(&r[11]),
        modification_time: text(&r[12]),
        is_family:         flag(&r[13]),
        max_debit:         decimal(&r[14]),
        minutiae:          bytes(&r[15]),
        minutiae2:         bytes(&r[16]),
        minutiae3:         bytes(&r[17]),
        salary:            decimal(&r[18]),
        face_templates:    [
          bytes(&r[19]),
          bytes(&r[20]),
          bytes(&r[21]),
          bytes(&r[22]),
          bytes(&r[23]),
        ],
      })
      .await
  }
}

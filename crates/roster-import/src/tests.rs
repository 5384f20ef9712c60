//! Reconciler tests against an in-memory roster store, fed either by an
//! in-memory legacy source or by a real legacy SQLite file.

use std::convert::Infallible;

use chrono::{NaiveDate, NaiveTime};
use roster_core::{
  Gender, Record, ResourceKind, Value,
  query::ListQuery,
  store::EntityStore,
  timestamp::{DatePart, TimePart},
};
use roster_store_sqlite::SqliteStore;
use rust_decimal::Decimal;

use crate::{
  ConnectionParams, Error, ImportSummary, LegacyMember, LegacyPerson, LegacySource,
  LegacyUser, LookupRow, Reconciler, SqliteLegacySource,
};

// ─── In-memory source ────────────────────────────────────────────────────────

#[derive(Default, Clone)]
struct MemorySource {
  shifts:           Vec<LookupRow>,
  roles:            Vec<LookupRow>,
  membership_types: Vec<LookupRow>,
  users:            Vec<LegacyUser>,
  persons:          Vec<LegacyPerson>,
  members:          Vec<LegacyMember>,
}

impl LegacySource for MemorySource {
  type Error = Infallible;

  async fn shifts(&self) -> Result<Vec<LookupRow>, Infallible> { Ok(self.shifts.clone()) }

  async fn roles(&self) -> Result<Vec<LookupRow>, Infallible> { Ok(self.roles.clone()) }

  async fn membership_types(&self) -> Result<Vec<LookupRow>, Infallible> {
    Ok(self.membership_types.clone())
  }

  async fn users(&self) -> Result<Vec<LegacyUser>, Infallible> { Ok(self.users.clone()) }

  async fn persons(&self) -> Result<Vec<LegacyPerson>, Infallible> {
    Ok(self.persons.clone())
  }

  async fn members(&self) -> Result<Vec<LegacyMember>, Infallible> {
    Ok(self.members.clone())
  }
}

/// Serves the lookup tables, then fails on `Sec_Users`.
struct BrokenUsers(MemorySource);

impl LegacySource for BrokenUsers {
  type Error = std::io::Error;

  async fn shifts(&self) -> Result<Vec<LookupRow>, Self::Error> { Ok(self.0.shifts.clone()) }

  async fn roles(&self) -> Result<Vec<LookupRow>, Self::Error> { Ok(self.0.roles.clone()) }

  async fn membership_types(&self) -> Result<Vec<LookupRow>, Self::Error> {
    Ok(self.0.membership_types.clone())
  }

  async fn users(&self) -> Result<Vec<LegacyUser>, Self::Error> {
    Err(std::io::Error::other("Sec_Users unreadable"))
  }

  async fn persons(&self) -> Result<Vec<LegacyPerson>, Self::Error> {
    Ok(self.0.persons.clone())
  }

  async fn members(&self) -> Result<Vec<LegacyMember>, Self::Error> {
    Ok(self.0.members.clone())
  }
}

fn lookup(id: i64, desc: &str) -> LookupRow {
  LookupRow { id: Some(id), desc: Some(desc.into()) }
}

fn source() -> MemorySource {
  MemorySource {
    shifts: vec![lookup(1, "Morning"), lookup(2, "Evening")],
    roles: vec![lookup(1, "Athlete")],
    membership_types: vec![lookup(1, "Monthly")],
    users: vec![LegacyUser {
      id: Some(1),
      person_id: Some(10),
      username: Some("admin".into()),
      is_admin: Some(true),
      shift_id: Some(2),
      is_active: None,
      creation_date: Some(DatePart::Text("2024-01-05".into())),
      creation_time: Some(TimePart::Text("08:30:00".into())),
      ..Default::default()
    }],
    persons: vec![
      LegacyPerson {
        id: Some(10),
        full_name: Some("Ali Rezaei".into()),
        gender: Some(1),
        shift_id: Some(1),
        user_id: Some(1),
        creation_date: Some(DatePart::Date(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap())),
        creation_time: Some(TimePart::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())),
        modification_time: Some("1402/03/11".into()),
        ..Default::default()
      },
      LegacyPerson {
        id: Some(11),
        full_name: Some("Sara Ahmadi".into()),
        gender: Some(0),
        shift_id: Some(99),
        creation_date: None,
        creation_time: Some(TimePart::Text("09:00:00".into())),
        ..Default::default()
      },
    ],
    members: vec![LegacyMember {
      id: Some(100),
      card_no: Some("A-100".into()),
      person_id: Some(10),
      role_id: Some(1),
      user_id: Some(1),
      membership_date: Some(DatePart::Text("2024-02-30".into())),
      membership_time: Some(TimePart::Text("10:00:00".into())),
      max_debit: Some(Decimal::new(12346, 3)),
      face_templates: [Some(vec![1, 2]), None, None, None, None],
      ..Default::default()
    }],
  }
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

async fn get(store: &SqliteStore, kind: ResourceKind, id: i64) -> Record {
  store.find_by_id(kind, id).await.unwrap().expect("record imported")
}

async fn all(store: &SqliteStore, kind: ResourceKind) -> Vec<Record> {
  let mut query = ListQuery::all(kind.schema());
  query.page.limit = 1_000;
  store.list(kind, &query).await.unwrap().items
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Value {
  Value::DateTime(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap())
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn imports_every_table_in_order() {
  let s = store().await;
  let summary = Reconciler::new(&s).run(&source()).await.unwrap();
  assert_eq!(
    summary,
    ImportSummary {
      shifts:           2,
      roles:            1,
      membership_types: 1,
      users:            1,
      persons:          2,
      members:          1,
      users_linked:     1,
      skipped:          0,
    }
  );

  let shift = get(&s, ResourceKind::Shift, 2).await;
  assert_eq!(shift.get("shift_desc"), Some(&Value::Text("Evening".into())));
  let kind = get(&s, ResourceKind::MembershipType, 1).await;
  assert_eq!(kind.get("membership_type_desc"), Some(&Value::Text("Monthly".into())));
}

#[tokio::test]
async fn timestamps_are_rebuilt_from_halves() {
  let s = store().await;
  Reconciler::new(&s).run(&source()).await.unwrap();

  let user = get(&s, ResourceKind::User, 1).await;
  assert_eq!(user.get("creation_datetime"), Some(&at(2024, 1, 5, 8, 30)));

  let ali = get(&s, ResourceKind::Person, 10).await;
  assert_eq!(ali.get("creation_datetime"), Some(&at(2023, 6, 1, 12, 0)));
  assert_eq!(ali.get("modification_datetime"), Some(&Value::Text("1402/03/11".into())));

  let sara = get(&s, ResourceKind::Person, 11).await;
  assert_eq!(sara.get("creation_datetime"), Some(&Value::Null));

  let member = get(&s, ResourceKind::Member, 100).await;
  assert_eq!(member.get("membership_datetime"), Some(&Value::Null));
}

#[tokio::test]
async fn references_resolve_only_when_present() {
  let s = store().await;
  Reconciler::new(&s).run(&source()).await.unwrap();

  let sara = get(&s, ResourceKind::Person, 11).await;
  assert_eq!(sara.get("shift"), Some(&Value::Null));

  let ali = get(&s, ResourceKind::Person, 10).await;
  assert_eq!(ali.get("shift"), Some(&Value::Integer(1)));
  assert_eq!(ali.get("user"), Some(&Value::Integer(1)));

  let member = get(&s, ResourceKind::Member, 100).await;
  assert_eq!(member.get("person"), Some(&Value::Integer(10)));
  assert_eq!(member.get("role"), Some(&Value::Integer(1)));
  assert_eq!(member.get("shift"), Some(&Value::Null));
}

#[tokio::test]
async fn user_is_linked_to_person_imported_after_it() {
  let s = store().await;
  Reconciler::new(&s).run(&source()).await.unwrap();
  let user = get(&s, ResourceKind::User, 1).await;
  assert_eq!(user.get("person"), Some(&Value::Integer(10)));
  assert_eq!(user.get("shift"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn values_are_mapped() {
  let s = store().await;
  Reconciler::new(&s).run(&source()).await.unwrap();

  let ali = get(&s, ResourceKind::Person, 10).await;
  assert_eq!(ali.get("gender"), Some(&Value::Gender(Gender::Male)));
  let sara = get(&s, ResourceKind::Person, 11).await;
  assert_eq!(sara.get("gender"), Some(&Value::Gender(Gender::Female)));
  assert_eq!(sara.get("has_parrent"), Some(&Value::Bool(false)));

  let user = get(&s, ResourceKind::User, 1).await;
  assert_eq!(user.get("is_admin"), Some(&Value::Bool(true)));
  assert_eq!(user.get("is_active"), Some(&Value::Bool(true)));

  let member = get(&s, ResourceKind::Member, 100).await;
  match member.get("max_debit") {
    Some(Value::Decimal(d)) => assert_eq!(d.to_string(), "12.35"),
    other => panic!("unexpected max_debit {other:?}"),
  }
  assert_eq!(member.get("face_template_1"), Some(&Value::Blob(vec![1, 2])));
  assert_eq!(member.get("has_finger"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn second_run_changes_nothing() {
  let s = store().await;
  let legacy = source();
  Reconciler::new(&s).run(&legacy).await.unwrap();

  let mut snapshot = Vec::new();
  for kind in [ResourceKind::Shift, ResourceKind::User, ResourceKind::Person, ResourceKind::Member] {
    snapshot.push(all(&s, kind).await);
  }

  let again = Reconciler::new(&s).run(&legacy).await.unwrap();
  assert_eq!(again.users_linked, 0);

  for (i, kind) in
    [ResourceKind::Shift, ResourceKind::User, ResourceKind::Person, ResourceKind::Member]
      .into_iter()
      .enumerate()
  {
    assert_eq!(all(&s, kind).await, snapshot[i], "{kind} changed on re-import");
  }
}

#[tokio::test]
async fn reimport_overwrites_changed_rows() {
  let s = store().await;
  let mut legacy = source();
  Reconciler::new(&s).run(&legacy).await.unwrap();

  legacy.shifts[0].desc = Some("Dawn".into());
  Reconciler::new(&s).run(&legacy).await.unwrap();
  let shift = get(&s, ResourceKind::Shift, 1).await;
  assert_eq!(shift.get("shift_desc"), Some(&Value::Text("Dawn".into())));
  assert_eq!(all(&s, ResourceKind::Shift).await.len(), 2);
}

#[tokio::test]
async fn rows_without_a_positive_id_are_skipped() {
  let s = store().await;
  let mut legacy = source();
  legacy.shifts.push(LookupRow { id: None, desc: Some("Night".into()) });
  legacy.shifts.push(LookupRow { id: Some(-3), desc: Some("Neg".into()) });
  legacy.persons.push(LegacyPerson {
    id: Some(0),
    full_name: Some("Nobody".into()),
    ..Default::default()
  });

  let summary = Reconciler::new(&s).run(&legacy).await.unwrap();
  assert_eq!(summary.shifts, 2);
  assert_eq!(summary.persons, 2);
  assert_eq!(summary.skipped, 3);

  let mut shifts: Vec<i64> =
    all(&s, ResourceKind::Shift).await.iter().filter_map(|r| r.id).collect();
  shifts.sort();
  assert_eq!(shifts, vec![1, 2]);
  assert_eq!(all(&s, ResourceKind::Person).await.len(), 2);
}

#[tokio::test]
async fn failure_mid_run_keeps_earlier_tables() {
  let s = store().await;
  let result = Reconciler::new(&s).run(&BrokenUsers(source())).await;
  assert!(matches!(result, Err(Error::Source(_))));

  assert_eq!(all(&s, ResourceKind::Shift).await.len(), 2);
  assert_eq!(all(&s, ResourceKind::Role).await.len(), 1);
  assert_eq!(all(&s, ResourceKind::MembershipType).await.len(), 1);
  assert!(all(&s, ResourceKind::User).await.is_empty());
  assert!(all(&s, ResourceKind::Person).await.is_empty());
}

// ─── SQLite legacy source ────────────────────────────────────────────────────

const LEGACY_DDL: &str = "
CREATE TABLE Gen_Shift (ShiftID INTEGER, ShiftDesc TEXT);
CREATE TABLE Gen_PersonRole (RoleID INTEGER, RoleDesc TEXT);
CREATE TABLE Gen_MembershipType (MembershipTypeID INTEGER, MembershipTypeDesc TEXT);
CREATE TABLE Sec_Users (
  UserID INTEGER, PersonID INTEGER, UserName TEXT, UPassword TEXT, IsAdmin INTEGER,
  ShiftID INTEGER, IsActive INTEGER, CreationDate TEXT, CreationTime TEXT
);
CREATE TABLE Gen_Person (
  PersonID INTEGER, FirstName TEXT, LastName TEXT, FullName TEXT, FatherName TEXT,
  Gender INTEGER, NationalCode TEXT, Nidentity TEXT, PersonImage BLOB,
  ThumbnailImage BLOB, BirthDate TEXT, Tel TEXT, Mobile TEXT, Email TEXT,
  Education TEXT, Job TEXT, HasInsurance INTEGER, InsuranceNo TEXT,
  InsStartDate TEXT, InsEndDate TEXT, PAddress TEXT, HasParrent INTEGER,
  TeamName TEXT, ShiftID INTEGER, UserID INTEGER, CreationDate TEXT,
  CreationTime TEXT, Modifier TEXT, ModificationTime TEXT
);
CREATE TABLE Gen_Members (
  MemberID INTEGER, CardNo TEXT, PersonID INTEGER, RoleID INTEGER, UserID INTEGER,
  ShiftID INTEGER, IsBlackList INTEGER, BoxRadifNo TEXT, HasFinger INTEGER,
  MembershipDate TEXT, MembershipTime TEXT, Modifier TEXT, Modificationtime TEXT,
  IsFamily INTEGER, MaxDebit REAL, Minutiae BLOB, Minutiae2 BLOB, Minutiae3 BLOB,
  Salary TEXT, FaceTmpl1 BLOB, FaceTmpl2 BLOB, FaceTmpl3 BLOB, FaceTmpl4 BLOB,
  FaceTmpl5 BLOB
);

INSERT INTO Gen_Shift VALUES (1, 'Morning');
INSERT INTO Gen_PersonRole VALUES (3, 'Coach');
INSERT INTO Gen_MembershipType VALUES (1, 'Yearly');
INSERT INTO Sec_Users VALUES (5, 7, 'reza', 'secret', 0, 1, NULL, '2024-01-05', '08:30:00');
INSERT INTO Gen_Person (PersonID, FullName, Gender, PersonImage, ShiftID, UserID, CreationDate, CreationTime)
  VALUES (7, 'Reza Karimi', 2, X'0102', 0, 5, NULL, '10:00:00');
INSERT INTO Gen_Members (MemberID, CardNo, PersonID, RoleID, IsBlackList, MembershipDate, MembershipTime, MaxDebit, Salary)
  VALUES (40, '0040', 7, 3, 1, '2023-12-31', '23:59:59', 250.5, '1200000');
";

fn legacy_file() -> (tempfile::TempDir, ConnectionParams) {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir(dir.path().join("branch")).unwrap();
  let conn = rusqlite::Connection::open(dir.path().join("branch").join("gym.db")).unwrap();
  conn.execute_batch(LEGACY_DDL).unwrap();
  (dir, ConnectionParams::new("branch", "gym.db"))
}

#[tokio::test]
async fn imports_from_sqlite_legacy_file() {
  let (dir, params) = legacy_file();
  let legacy = SqliteLegacySource::connect(Some(dir.path()), &params).await.unwrap();
  let s = store().await;
  let summary = Reconciler::new(&s).run(&legacy).await.unwrap();
  assert_eq!(summary.users, 1);
  assert_eq!(summary.persons, 1);
  assert_eq!(summary.members, 1);
  assert_eq!(summary.users_linked, 1);

  let user = get(&s, ResourceKind::User, 5).await;
  assert_eq!(user.get("creation_datetime"), Some(&at(2024, 1, 5, 8, 30)));
  assert_eq!(user.get("person"), Some(&Value::Integer(7)));
  assert_eq!(user.get("is_active"), Some(&Value::Bool(true)));

  let person = get(&s, ResourceKind::Person, 7).await;
  assert_eq!(person.get("gender"), Some(&Value::Gender(Gender::Other)));
  assert_eq!(person.get("shift"), Some(&Value::Null));
  assert_eq!(person.get("user"), Some(&Value::Integer(5)));
  assert_eq!(person.get("person_image"), Some(&Value::Blob(vec![1, 2])));
  assert_eq!(person.get("creation_datetime"), Some(&Value::Null));

  let member = get(&s, ResourceKind::Member, 40).await;
  assert_eq!(member.get("is_black_list"), Some(&Value::Bool(true)));
  assert_eq!(member.get("role"), Some(&Value::Integer(3)));
  match (member.get("max_debit"), member.get("salary")) {
    (Some(Value::Decimal(debit)), Some(Value::Decimal(salary))) => {
      assert_eq!(debit.to_string(), "250.50");
      assert_eq!(salary.to_string(), "1200000.00");
    }
    other => panic!("unexpected amounts {other:?}"),
  }
}

#[tokio::test]
async fn unusable_legacy_ids_are_not_imported() {
  let (dir, params) = legacy_file();
  rusqlite::Connection::open(dir.path().join("branch").join("gym.db"))
    .unwrap()
    .execute_batch(
      "INSERT INTO Gen_Shift VALUES (NULL, 'Night');
       INSERT INTO Gen_Shift VALUES ('abc', 'Weekend');
       INSERT INTO Gen_Shift VALUES (-3, 'Neg');",
    )
    .unwrap();

  let legacy = SqliteLegacySource::connect(Some(dir.path()), &params).await.unwrap();
  let s = store().await;
  let summary = Reconciler::new(&s).run(&legacy).await.unwrap();
  assert_eq!(summary.shifts, 1);
  assert_eq!(summary.skipped, 3);

  let shifts = all(&s, ResourceKind::Shift).await;
  assert_eq!(shifts.len(), 1);
  assert_eq!(shifts[0].id, Some(1));
  assert_eq!(shifts[0].get("shift_desc"), Some(&Value::Text("Morning".into())));
}

#[tokio::test]
async fn missing_legacy_file_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let params = ConnectionParams::new("nowhere", "gym.db");
  let result = SqliteLegacySource::connect(Some(dir.path()), &params).await;
  assert!(matches!(result, Err(Error::DatabaseNotFound(_))));
}

#[tokio::test]
async fn missing_legacy_table_aborts_the_run() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("empty.db");
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute_batch("CREATE TABLE unrelated (x INTEGER);")
    .unwrap();
  let legacy = SqliteLegacySource::open(&path).await.unwrap();
  let s = store().await;
  let result = Reconciler::new(&s).run(&legacy).await;
  assert!(matches!(result, Err(Error::Source(_))));
}

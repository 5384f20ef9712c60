//! SQL schema for the Roster SQLite store.
//!
//! Column names and types mirror the field tables in `roster_core::schema`.
//! Booleans are `0`/`1`, decimals are two-place text, dates and datetimes
//! are ISO 8601 text and the locker log is a JSON array.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS shifts (
    id          INTEGER PRIMARY KEY,
    shift_desc  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_roles (
    id          INTEGER PRIMARY KEY,
    role_desc   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS membership_types (
    id                    INTEGER PRIMARY KEY,
    membership_type_desc  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id                 INTEGER PRIMARY KEY,
    person_id          INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    username           TEXT,
    password           TEXT,
    is_admin           INTEGER NOT NULL DEFAULT 0,
    shift_id           INTEGER REFERENCES shifts(id) ON DELETE SET NULL,
    is_active          INTEGER NOT NULL DEFAULT 1,
    creation_datetime  TEXT
);

CREATE TABLE IF NOT EXISTS persons (
    id                     INTEGER PRIMARY KEY,
    first_name             TEXT,
    last_name              TEXT,
    full_name              TEXT,
    father_name            TEXT,
    gender                 TEXT,            -- 'Male' | 'Female' | 'Other'
    national_code          TEXT,
    nidentity              TEXT,
    person_image           BLOB,
    thumbnail_image        BLOB,
    birth_date             TEXT,
    tel                    TEXT,
    mobile                 TEXT,
    email                  TEXT,
    education              TEXT,
    job                    TEXT,
    has_insurance          INTEGER DEFAULT 0,
    insurance_no           TEXT,
    ins_start_date         TEXT,
    ins_end_date           TEXT,
    address                TEXT,
    has_parrent            INTEGER NOT NULL DEFAULT 0,
    team_name              TEXT,
    shift_id               INTEGER REFERENCES shifts(id) ON DELETE SET NULL,
    user_id                INTEGER REFERENCES users(id) ON DELETE SET NULL,
    creation_datetime      TEXT,
    modifier               TEXT,
    modification_datetime  TEXT
);

CREATE TABLE IF NOT EXISTS members (
    id                     INTEGER PRIMARY KEY,
    card_no                TEXT,
    person_id              INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    role_id                INTEGER REFERENCES person_roles(id) ON DELETE SET NULL,
    user_id                INTEGER REFERENCES users(id) ON DELETE SET NULL,
    shift_id               INTEGER REFERENCES shifts(id) ON DELETE SET NULL,
    is_black_list          INTEGER NOT NULL DEFAULT 0,
    box_radif_no           TEXT,
    has_finger             INTEGER DEFAULT 1,
    membership_datetime    TEXT,
    modifier               TEXT,
    modification_datetime  TEXT,
    is_family              INTEGER DEFAULT 0,
    max_debit              TEXT,            -- decimal, two places
    minutiae               BLOB,
    minutiae2              BLOB,
    minutiae3              BLOB,
    salary                 TEXT,            -- decimal, two places
    face_template_1        BLOB,
    face_template_2        BLOB,
    face_template_3        BLOB,
    face_template_4        BLOB,
    face_template_5        BLOB
);

CREATE TABLE IF NOT EXISTS lockers (
    id         INTEGER PRIMARY KEY,
    is_vip     INTEGER NOT NULL DEFAULT 0,
    is_open    INTEGER NOT NULL DEFAULT 0,
    log        TEXT,                        -- JSON array of {full_name, datetime}
    person_id  INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    full_name  TEXT
);

-- A member's attendance log goes with the member.
CREATE TABLE IF NOT EXISTS logs (
    id          INTEGER PRIMARY KEY,
    member_id   INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
    full_name   TEXT,
    is_online   INTEGER NOT NULL DEFAULT 1,
    entry_time  TEXT,
    exit_time   TEXT
);

CREATE TABLE IF NOT EXISTS payments (
    id              INTEGER PRIMARY KEY,
    person_id       INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    price           INTEGER,
    payment_date    TEXT,
    duration        TEXT,
    paid_method     TEXT,
    payment_status  TEXT,
    full_name       TEXT
);

CREATE INDEX IF NOT EXISTS idx_logs_member     ON logs(member_id);
CREATE INDEX IF NOT EXISTS idx_members_person  ON members(person_id);
CREATE INDEX IF NOT EXISTS idx_payments_person ON payments(person_id);
";

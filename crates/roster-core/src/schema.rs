//! Static field tables, one [`Schema`] per [`ResourceKind`].
//!
//! The schema is the single description of an entity: the payload validator,
//! the filter builder, the JSON encoder and the SQLite backend all walk it.
//! Field names are the JSON names; `column` is the storage column.

use crate::resource::ResourceKind;

// ─── Field types ─────────────────────────────────────────────────────────────

/// The scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
  Integer,
  Text,
  /// Text that must look like an email address.
  Email,
  Bool,
  /// Fixed-point, two decimal places, at most ten digits.
  Decimal,
  Date,
  DateTime,
  /// Opaque bytes; base64 text at the JSON boundary.
  Blob,
  Gender,
  /// Nullable foreign key holding the id of another record.
  Reference(ResourceKind),
  /// The locker audit trail, stored as an embedded JSON list.
  LockerLog,
}

/// How a query parameter for this field is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
  Exact,
  /// Case-insensitive substring.
  Contains,
  /// The field cannot appear in a filter.
  Never,
}

// ─── Field ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Field {
  pub name:      &'static str,
  pub column:    &'static str,
  pub ty:        FieldType,
  /// Must be present (and non-blank) on create.
  pub required:  bool,
  pub nullable:  bool,
  /// Set by the system; silently dropped from inbound payloads.
  pub read_only: bool,
  /// Value used on create when a boolean field is omitted.
  pub default:   Option<bool>,
  pub matching:  Match,
}

impl Field {
  const fn new(name: &'static str, ty: FieldType) -> Self {
    let matching = match ty {
      FieldType::Blob | FieldType::LockerLog => Match::Never,
      _ => Match::Exact,
    };
    Self {
      name,
      column: name,
      ty,
      required: false,
      nullable: true,
      read_only: false,
      default: None,
      matching,
    }
  }

  const fn required(self) -> Self {
    Self { required: true, nullable: false, ..self }
  }

  const fn read_only(self) -> Self { Self { read_only: true, ..self } }

  /// Non-null boolean with a default.
  const fn flag(self, default: bool) -> Self {
    Self { default: Some(default), nullable: false, ..self }
  }

  /// Nullable boolean with a default.
  const fn nullable_flag(self, default: bool) -> Self {
    Self { default: Some(default), ..self }
  }

  const fn contains(self) -> Self { Self { matching: Match::Contains, ..self } }

  const fn column(self, column: &'static str) -> Self {
    Self { column, ..self }
  }
}

const fn text(name: &'static str) -> Field { Field::new(name, FieldType::Text) }

const fn boolean(name: &'static str) -> Field { Field::new(name, FieldType::Bool) }

const fn blob(name: &'static str) -> Field { Field::new(name, FieldType::Blob) }

const fn reference(
  name: &'static str,
  column: &'static str,
  target: ResourceKind,
) -> Field {
  Field::new(name, FieldType::Reference(target)).column(column)
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Schema {
  pub kind:       ResourceKind,
  pub table:      &'static str,
  /// Every field except `id`, in storage order.
  pub fields:     &'static [Field],
  /// Column sorted on by `order_by=latest|earlier`.
  pub recency:    &'static str,
  /// Whether clients may choose ids on create. When `false` the store
  /// assigns them.
  pub client_ids: bool,
}

impl Schema {
  pub fn field(&self, name: &str) -> Option<&'static Field> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// Fields that reference another kind, with their targets.
  pub fn references(&self) -> impl Iterator<Item = (&'static Field, ResourceKind)> {
    self.fields.iter().filter_map(|f| match f.ty {
      FieldType::Reference(target) => Some((f, target)),
      _ => None,
    })
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

pub static SHIFT: Schema = Schema {
  kind:       ResourceKind::Shift,
  table:      "shifts",
  fields:     &[text("shift_desc").required()],
  recency:    "id",
  client_ids: true,
};

pub static ROLE: Schema = Schema {
  kind:       ResourceKind::Role,
  table:      "person_roles",
  fields:     &[text("role_desc").required()],
  recency:    "id",
  client_ids: true,
};

pub static MEMBERSHIP_TYPE: Schema = Schema {
  kind:       ResourceKind::MembershipType,
  table:      "membership_types",
  fields:     &[text("membership_type_desc").required()],
  recency:    "id",
  client_ids: true,
};

pub static USER: Schema = Schema {
  kind:       ResourceKind::User,
  table:      "users",
  fields:     &[
    reference("person", "person_id", ResourceKind::Person),
    text("username"),
    text("password"),
    boolean("is_admin").flag(false),
    reference("shift", "shift_id", ResourceKind::Shift),
    boolean("is_active").flag(true),
    Field::new("creation_datetime", FieldType::DateTime).read_only(),
  ],
  recency:    "creation_datetime",
  client_ids: true,
};

pub static PERSON: Schema = Schema {
  kind:       ResourceKind::Person,
  table:      "persons",
  fields:     &[
    text("first_name"),
    text("last_name"),
    text("full_name").contains(),
    text("father_name"),
    Field::new("gender", FieldType::Gender),
    text("national_code"),
    text("nidentity"),
    blob("person_image"),
    blob("thumbnail_image"),
    text("birth_date"),
    text("tel"),
    text("mobile"),
    Field::new("email", FieldType::Email),
    text("education"),
    text("job"),
    boolean("has_insurance").nullable_flag(false),
    text("insurance_no"),
    text("ins_start_date"),
    text("ins_end_date"),
    text("address"),
    boolean("has_parrent").flag(false),
    text("team_name"),
    reference("shift", "shift_id", ResourceKind::Shift),
    reference("user", "user_id", ResourceKind::User),
    Field::new("creation_datetime", FieldType::DateTime).read_only(),
    text("modifier"),
    text("modification_datetime"),
  ],
  recency:    "creation_datetime",
  client_ids: true,
};

pub static MEMBER: Schema = Schema {
  kind:       ResourceKind::Member,
  table:      "members",
  fields:     &[
    text("card_no"),
    reference("person", "person_id", ResourceKind::Person),
    reference("role", "role_id", ResourceKind::Role),
    reference("user", "user_id", ResourceKind::User),
    reference("shift", "shift_id", ResourceKind::Shift),
    boolean("is_black_list").flag(false),
    text("box_radif_no"),
    boolean("has_finger").nullable_flag(true),
    Field::new("membership_datetime", FieldType::DateTime),
    text("modifier"),
    text("modification_datetime"),
    boolean("is_family").nullable_flag(false),
    Field::new("max_debit", FieldType::Decimal),
    blob("minutiae"),
    blob("minutiae2"),
    blob("minutiae3"),
    Field::new("salary", FieldType::Decimal),
    blob("face_template_1"),
    blob("face_template_2"),
    blob("face_template_3"),
    blob("face_template_4"),
    blob("face_template_5"),
  ],
  recency:    "id",
  client_ids: true,
};

pub static LOCKER: Schema = Schema {
  kind:       ResourceKind::Locker,
  table:      "lockers",
  fields:     &[
    boolean("is_vip").flag(false),
    boolean("is_open").flag(false),
    Field::new("log", FieldType::LockerLog),
    reference("user", "person_id", ResourceKind::Person),
    text("full_name").contains(),
  ],
  recency:    "id",
  client_ids: false,
};

pub static LOG: Schema = Schema {
  kind:       ResourceKind::Log,
  table:      "logs",
  fields:     &[
    reference("user", "member_id", ResourceKind::Member).required(),
    text("full_name").contains(),
    boolean("is_online").flag(true),
    Field::new("entry_time", FieldType::DateTime).read_only(),
    Field::new("exit_time", FieldType::DateTime).read_only(),
  ],
  recency:    "id",
  client_ids: false,
};

pub static PAYMENT: Schema = Schema {
  kind:       ResourceKind::Payment,
  table:      "payments",
  fields:     &[
    reference("user", "person_id", ResourceKind::Person),
    Field::new("price", FieldType::Integer),
    Field::new("payment_date", FieldType::Date).read_only(),
    text("duration").contains(),
    text("paid_method").contains(),
    text("payment_status").contains(),
    text("full_name").contains(),
  ],
  recency:    "id",
  client_ids: false,
};

//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps in mirrored columns are RFC 3339 with fixed microsecond
//! precision so that they order lexically. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use marquee_core::{
  actor::Role,
  entity::EntityKind,
  resource::Resource,
  user::{Profile, User},
  validate::ValidationErrors,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// A `LIMIT`/`OFFSET` operand. Values past `i64::MAX` are rejected against
/// `field` rather than wrapped.
pub fn encode_count(n: u64, field: &str) -> Result<i64> {
  i64::try_from(n)
    .map_err(|_| Error::Core(ValidationErrors::single(field, "is too large").into()))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// JSON array of id strings, consumed in SQL through `json_each(?)`.
pub fn encode_id_list(ids: &[Uuid]) -> String {
  let strings: Vec<String> = ids.iter().copied().map(encode_uuid).collect();
  serde_json::Value::from(strings).to_string()
}

// ─── Kinds ───────────────────────────────────────────────────────────────────

pub fn table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Genre => "genres",
    EntityKind::Director => "directors",
    EntityKind::Producer => "producers",
    EntityKind::Type => "types",
    EntityKind::Media => "media",
  }
}

/// JSON path of the display name used in reference summaries.
pub fn name_path(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Media => "$.title",
    _ => "$.name",
  }
}

/// The `media` column holding a single-valued reference to `kind`. Genres
/// live in `media_genres` instead.
pub fn reference_column(kind: EntityKind) -> Option<&'static str> {
  match kind {
    EntityKind::Type => Some("type_id"),
    EntityKind::Director => Some("director_id"),
    EntityKind::Producer => Some("producer_id"),
    EntityKind::Genre | EntityKind::Media => None,
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Column values for one entity row.
pub struct DocRow {
  pub kind:       EntityKind,
  pub id:         String,
  pub name_key:   String,
  pub is_active:  bool,
  pub created_by: String,
  pub created_at: String,
  pub updated_at: String,
  pub doc:        String,
  /// Outgoing references, only populated for media.
  pub references: Vec<(EntityKind, String)>,
  /// Name used in duplicate-key messages.
  pub display:    String,
}

impl DocRow {
  pub fn encode<R: Resource>(doc: &R) -> Result<Self> {
    let meta = doc.meta();
    Ok(Self {
      kind:       R::KIND,
      id:         encode_uuid(meta.id),
      name_key:   doc.unique_key(),
      is_active:  meta.is_active,
      created_by: meta.created_by.to_string(),
      created_at: encode_dt(meta.created_at),
      updated_at: encode_dt(meta.updated_at),
      doc:        serde_json::to_string(doc)?,
      references: doc
        .references()
        .into_iter()
        .map(|(kind, id)| (kind, encode_uuid(id)))
        .collect(),
      display:    doc.display_name().to_owned(),
    })
  }

  pub fn reference(&self, kind: EntityKind) -> Option<&str> {
    self
      .references
      .iter()
      .find(|(k, _)| *k == kind)
      .map(|(_, id)| id.as_str())
  }

  pub fn genres(&self) -> impl Iterator<Item = &str> {
    self
      .references
      .iter()
      .filter(|(k, _)| *k == EntityKind::Genre)
      .map(|(_, id)| id.as_str())
  }

  pub fn duplicate_message(&self) -> String {
    format!("{} {:?} already exists", self.kind, self.display)
  }
}

pub fn decode_doc<R: Resource>(raw: &str) -> Result<R> { Ok(serde_json::from_str(raw)?) }

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_active, profile, \
                                last_login, refresh_token, created_at, updated_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub id:            String,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
  pub is_active:     bool,
  pub profile:       String,
  pub last_login:    Option<String>,
  pub refresh_token: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      role:          row.get(4)?,
      is_active:     row.get(5)?,
      profile:       row.get(6)?,
      last_login:    row.get(7)?,
      refresh_token: row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let role: Role = self
      .role
      .parse()
      .map_err(|_| Error::DateParse(format!("unknown role: {:?}", self.role)))?;
    let profile: Profile = serde_json::from_str(&self.profile)?;
    Ok(User {
      id: decode_uuid(&self.id)?,
      username: self.username,
      email: self.email,
      password_hash: self.password_hash,
      role,
      is_active: self.is_active,
      profile,
      last_login: self.last_login.as_deref().map(decode_dt).transpose()?,
      refresh_token: self.refresh_token,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column values for a `users` write, in [`USER_COLUMNS`] order.
pub struct UserRow {
  pub id:            String,
  pub username:      String,
  pub username_key:  String,
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
  pub is_active:     bool,
  pub profile:       String,
  pub last_login:    Option<String>,
  pub refresh_token: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl UserRow {
  pub fn encode(user: &User) -> Result<Self> {
    Ok(Self {
      id:            encode_uuid(user.id),
      username:      user.username.clone(),
      username_key:  user.username.to_lowercase(),
      email:         user.email.to_lowercase(),
      password_hash: user.password_hash.clone(),
      role:          user.role.to_string(),
      is_active:     user.is_active,
      profile:       serde_json::to_string(&user.profile)?,
      last_login:    user.last_login.map(encode_dt),
      refresh_token: user.refresh_token.clone(),
      created_at:    encode_dt(user.created_at),
      updated_at:    encode_dt(user.updated_at),
    })
  }
}

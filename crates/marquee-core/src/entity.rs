//! Pieces shared by every catalog entity: the kind discriminant, the common
//! metadata block, ownership, and the display summary used when expanding
//! references.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString, VariantNames};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The five catalog collections.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Genre,
  Director,
  Producer,
  Type,
  Media,
}

impl EntityKind {
  /// Insertion order for mixed bundles: dependencies before dependents.
  pub const ALL: [EntityKind; 5] = [
    EntityKind::Genre,
    EntityKind::Director,
    EntityKind::Producer,
    EntityKind::Type,
    EntityKind::Media,
  ];

  /// Kinds that media can point at.
  pub const REFERENCABLE: [EntityKind; 4] = [
    EntityKind::Genre,
    EntityKind::Director,
    EntityKind::Producer,
    EntityKind::Type,
  ];

  pub fn is_referencable(self) -> bool { !matches!(self, Self::Media) }
}

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Who created a document. Serialised as `"system"` or the user's UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Owner {
  #[default]
  System,
  User(Uuid),
}

impl fmt::Display for Owner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Owner::System => f.write_str("system"),
      Owner::User(id) => write!(f, "{id}"),
    }
  }
}

impl FromStr for Owner {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s == "system" {
      Ok(Owner::System)
    } else {
      Uuid::parse_str(s).map(Owner::User)
    }
  }
}

impl Serialize for Owner {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Owner {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Identity, lifecycle flag and audit fields carried by every entity.
/// Flattened into each entity's JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
  pub id:         Uuid,
  pub is_active:  bool,
  pub created_by: Owner,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Meta {
  /// Fresh metadata for a document about to be created by `owner`.
  pub fn new(owner: Owner) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      is_active: true,
      created_by: owner,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

// ─── Shared value types ──────────────────────────────────────────────────────

/// Display subset of a referenced entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub id:   Uuid,
  pub name: String,
}

/// Currencies accepted for budgets and box-office figures.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
  Usd,
  Eur,
  Gbp,
  Mxn,
  Jpy,
}

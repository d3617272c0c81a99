//! The [`Resource`] trait: what the query engine, the store and the catalog
//! service need to know about an entity kind.

use std::str::FromStr;

use serde::{Serialize, de::DeserializeOwned};
use strum::VariantNames;
use uuid::Uuid;

use crate::{
  entity::{EntityKind, Meta},
  query::{Field, Predicate, QueryParams},
  validate::ValidationErrors,
};

/// A closed allow-list of sortable fields. Each variant maps to a document
/// field; client strings never reach the store directly.
pub trait SortKey:
  Copy + Default + FromStr + VariantNames + std::fmt::Debug + Send + Sync + 'static
{
  fn field(self) -> Field;
}

/// A catalog entity kind.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
  const KIND: EntityKind;

  type Sort: SortKey;
  /// Body accepted on create.
  type Draft: DeserializeOwned + Send + 'static;
  /// Body accepted on update; absent fields are left untouched.
  type Patch: DeserializeOwned + Send + 'static;

  fn meta(&self) -> &Meta;
  fn meta_mut(&mut self) -> &mut Meta;

  /// The natural key (`name` or `title`).
  fn display_name(&self) -> &str;

  /// Case-folded natural key backing the uniqueness index.
  fn unique_key(&self) -> String { fold_key(self.display_name()) }

  /// Text fields searched by the `search` parameter.
  fn search_fields() -> &'static [Field];

  /// Resource-specific filter parameters. Malformed values are recorded in
  /// `errors`; unknown keys are ignored.
  fn filter_terms(params: &QueryParams, errors: &mut ValidationErrors) -> Vec<Predicate>;

  fn from_draft(draft: Self::Draft, meta: Meta) -> Self;

  fn merge(&mut self, patch: Self::Patch);

  /// Pre-save normalisation (trimming, set deduplication, derived fields).
  fn normalize(&mut self) {}

  fn validate(&self) -> Result<(), ValidationErrors>;

  /// Outgoing references that must exist at write time.
  fn references(&self) -> Vec<(EntityKind, Uuid)> { Vec::new() }
}

pub fn fold_key(s: &str) -> String { s.trim().to_lowercase() }

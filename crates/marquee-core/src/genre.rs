//! Genres.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::{
  entity::{EntityKind, Meta},
  query::{Field, Predicate, QueryParams, Scalar},
  resource::{Resource, SortKey},
  validate::{self, ValidationErrors},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
  #[serde(flatten)]
  pub meta:        Meta,
  pub name:        String,
  pub description: Option<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGenre {
  pub name:        String,
  pub description: Option<String>,
  #[serde(default)]
  pub tags:        Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenrePatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub tags:        Option<Vec<String>>,
  pub is_active:   Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum GenreSort {
  #[default]
  Name,
  CreatedAt,
  UpdatedAt,
}

impl SortKey for GenreSort {
  fn field(self) -> Field {
    match self {
      GenreSort::Name => Field::At("$.name"),
      GenreSort::CreatedAt => Field::At("$.createdAt"),
      GenreSort::UpdatedAt => Field::At("$.updatedAt"),
    }
  }
}

const SEARCH_FIELDS: &[Field] = &[
  Field::At("$.name"),
  Field::At("$.description"),
  Field::Each("$.tags"),
];

impl Resource for Genre {
  const KIND: EntityKind = EntityKind::Genre;

  type Draft = NewGenre;
  type Patch = GenrePatch;
  type Sort = GenreSort;

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn display_name(&self) -> &str { &self.name }

  fn search_fields() -> &'static [Field] { SEARCH_FIELDS }

  fn filter_terms(params: &QueryParams, _errors: &mut ValidationErrors) -> Vec<Predicate> {
    params
      .get("tag")
      .map(|tag| {
        Predicate::Equals(Field::Each("$.tags"), Scalar::Text(tag.to_lowercase()))
      })
      .into_iter()
      .collect()
  }

  fn from_draft(draft: NewGenre, meta: Meta) -> Self {
    Self {
      meta,
      name: draft.name,
      description: draft.description,
      tags: draft.tags,
    }
  }

  fn merge(&mut self, patch: GenrePatch) {
    if let Some(name) = patch.name {
      self.name = name;
    }
    if let Some(description) = patch.description {
      self.description = Some(description);
    }
    if let Some(tags) = patch.tags {
      self.tags = tags;
    }
    if let Some(active) = patch.is_active {
      self.meta.is_active = active;
    }
  }

  fn normalize(&mut self) {
    validate::trim(&mut self.name);
    validate::trim_opt(&mut self.description);
    validate::normalize_tags(&mut self.tags);
  }

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::required_text(&mut errors, "name", &self.name, 2, 50);
    validate::max_text(&mut errors, "description", self.description.as_deref(), 500);
    if self.tags.iter().any(|t| t.chars().count() > 30) {
      errors.push("tags", "each tag must be at most 30 characters");
    }
    errors.finish()
  }
}

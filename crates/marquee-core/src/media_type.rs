//! Media types (film, series, documentary, …).
//!
//! The type's `name` is itself drawn from a closed set, so at most one type
//! document exists per [`TypeName`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::{
  entity::{EntityKind, Meta},
  query::{Field, Predicate, QueryParams, Scalar},
  resource::{Resource, SortKey},
  validate::{self, ValidationErrors},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantNames,
)]
pub enum TypeName {
  #[serde(rename = "Película")]
  #[strum(serialize = "Película")]
  Pelicula,
  Serie,
  Documental,
  Miniserie,
  Cortometraje,
  Anime,
  Reality,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TypeCategory {
  Fiction,
  NonFiction,
  Animation,
  Entertainment,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TypeFormat {
  Feature,
  Episodic,
  Limited,
  Short,
  Special,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
  #[default]
  Minutes,
  Hours,
  Episodes,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
  Cinema,
  Television,
  Streaming,
  HomeVideo,
  Festival,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationRange {
  pub min:  Option<u32>,
  pub max:  Option<u32>,
  #[serde(default)]
  pub unit: DurationUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaType {
  #[serde(flatten)]
  pub meta:            Meta,
  pub name:            TypeName,
  pub description:     Option<String>,
  pub category:        TypeCategory,
  pub format:          TypeFormat,
  pub duration:        Option<DurationRange>,
  #[serde(default)]
  pub characteristics: Vec<String>,
  #[serde(default)]
  pub platforms:       Vec<Platform>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaType {
  pub name:            TypeName,
  pub description:     Option<String>,
  pub category:        TypeCategory,
  pub format:          TypeFormat,
  pub duration:        Option<DurationRange>,
  #[serde(default)]
  pub characteristics: Vec<String>,
  #[serde(default)]
  pub platforms:       Vec<Platform>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypePatch {
  pub name:            Option<TypeName>,
  pub description:     Option<String>,
  pub category:        Option<TypeCategory>,
  pub format:          Option<TypeFormat>,
  pub duration:        Option<DurationRange>,
  pub characteristics: Option<Vec<String>>,
  pub platforms:       Option<Vec<Platform>>,
  pub is_active:       Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum MediaTypeSort {
  #[default]
  Name,
  Category,
  CreatedAt,
}

impl SortKey for MediaTypeSort {
  fn field(self) -> Field {
    match self {
      MediaTypeSort::Name => Field::At("$.name"),
      MediaTypeSort::Category => Field::At("$.category"),
      MediaTypeSort::CreatedAt => Field::At("$.createdAt"),
    }
  }
}

const SEARCH_FIELDS: &[Field] = &[Field::At("$.name"), Field::Each("$.characteristics")];

impl Resource for MediaType {
  const KIND: EntityKind = EntityKind::Type;

  type Draft = NewMediaType;
  type Patch = MediaTypePatch;
  type Sort = MediaTypeSort;

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn display_name(&self) -> &str { self.name.into() }

  fn search_fields() -> &'static [Field] { SEARCH_FIELDS }

  fn filter_terms(params: &QueryParams, errors: &mut ValidationErrors) -> Vec<Predicate> {
    let mut terms = Vec::new();
    if let Some(category) = params.parse_enum::<TypeCategory>("category", errors) {
      terms.push(Predicate::Equals(
        Field::At("$.category"),
        Scalar::Text(category.to_string()),
      ));
    }
    if let Some(format) = params.parse_enum::<TypeFormat>("format", errors) {
      terms.push(Predicate::Equals(Field::At("$.format"), Scalar::Text(format.to_string())));
    }
    if let Some(platform) = params.parse_enum::<Platform>("platform", errors) {
      terms.push(Predicate::Equals(
        Field::Each("$.platforms"),
        Scalar::Text(platform.to_string()),
      ));
    }
    terms
  }

  fn from_draft(draft: NewMediaType, meta: Meta) -> Self {
    Self {
      meta,
      name: draft.name,
      description: draft.description,
      category: draft.category,
      format: draft.format,
      duration: draft.duration,
      characteristics: draft.characteristics,
      platforms: draft.platforms,
    }
  }

  fn merge(&mut self, patch: MediaTypePatch) {
    if let Some(v) = patch.name {
      self.name = v;
    }
    if let Some(v) = patch.description {
      self.description = Some(v);
    }
    if let Some(v) = patch.category {
      self.category = v;
    }
    if let Some(v) = patch.format {
      self.format = v;
    }
    if let Some(v) = patch.duration {
      self.duration = Some(v);
    }
    if let Some(v) = patch.characteristics {
      self.characteristics = v;
    }
    if let Some(v) = patch.platforms {
      self.platforms = v;
    }
    if let Some(active) = patch.is_active {
      self.meta.is_active = active;
    }
  }

  fn normalize(&mut self) {
    validate::trim_opt(&mut self.description);
    validate::normalize_tags(&mut self.characteristics);
    validate::dedup(&mut self.platforms);
  }

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::max_text(&mut errors, "description", self.description.as_deref(), 500);
    if let Some(DurationRange { min: Some(min), max: Some(max), .. }) = self.duration
      && min > max
    {
      errors.push("duration", "min must not exceed max");
    }
    errors.finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::Owner;

  #[test]
  fn type_names_keep_their_accents() {
    assert_eq!(TypeName::Pelicula.to_string(), "Película");
    assert_eq!("Película".parse::<TypeName>().unwrap(), TypeName::Pelicula);
    assert_eq!(serde_json::to_value(TypeName::Pelicula).unwrap(), "Película");
    assert!("Pelicula".parse::<TypeName>().is_err());
  }

  #[test]
  fn duration_range_must_be_ordered() {
    let t = MediaType::from_draft(
      NewMediaType {
        name:            TypeName::Serie,
        description:     None,
        category:        TypeCategory::Fiction,
        format:          TypeFormat::Episodic,
        duration:        Some(DurationRange { min: Some(60), max: Some(20), unit: DurationUnit::Minutes }),
        characteristics: vec![],
        platforms:       vec![Platform::Streaming, Platform::Streaming],
      },
      Meta::new(Owner::System),
    );
    assert!(t.validate().unwrap_err().has("duration"));
    assert_eq!(t.unique_key(), "serie");
  }
}

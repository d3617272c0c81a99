//! Producers (studios and production companies).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::{
  entity::{Currency, EntityKind, Meta},
  query::{Field, Predicate, QueryParams, Scalar},
  resource::{Resource, SortKey},
  validate::{self, ValidationErrors},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Specialty {
  Drama,
  Comedy,
  Action,
  Documentary,
  Animation,
  Horror,
  ScienceFiction,
  Thriller,
  Romance,
  Family,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BudgetRange {
  Low,
  Medium,
  High,
  Blockbuster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headquarters {
  pub city:     Option<String>,
  pub address:  Option<String>,
  pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  pub website: Option<String>,
  pub email:   Option<String>,
  pub phone:   Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
  pub currency: Option<Currency>,
  pub range:    Option<BudgetRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
  #[serde(flatten)]
  pub meta:         Meta,
  pub name:         String,
  pub description:  Option<String>,
  pub founded_year: Option<i32>,
  pub country:      Option<String>,
  #[serde(default)]
  pub headquarters: Headquarters,
  #[serde(default)]
  pub contact:      Contact,
  #[serde(default)]
  pub specialties:  Vec<Specialty>,
  #[serde(default)]
  pub budget:       Budget,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProducer {
  pub name:         String,
  pub description:  Option<String>,
  pub founded_year: Option<i32>,
  pub country:      Option<String>,
  #[serde(default)]
  pub headquarters: Headquarters,
  #[serde(default)]
  pub contact:      Contact,
  #[serde(default)]
  pub specialties:  Vec<Specialty>,
  #[serde(default)]
  pub budget:       Budget,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerPatch {
  pub name:         Option<String>,
  pub description:  Option<String>,
  pub founded_year: Option<i32>,
  pub country:      Option<String>,
  pub headquarters: Option<Headquarters>,
  pub contact:      Option<Contact>,
  pub specialties:  Option<Vec<Specialty>>,
  pub budget:       Option<Budget>,
  pub is_active:    Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum ProducerSort {
  #[default]
  Name,
  FoundedYear,
  Country,
  CreatedAt,
}

impl SortKey for ProducerSort {
  fn field(self) -> Field {
    match self {
      ProducerSort::Name => Field::At("$.name"),
      ProducerSort::FoundedYear => Field::At("$.foundedYear"),
      ProducerSort::Country => Field::At("$.country"),
      ProducerSort::CreatedAt => Field::At("$.createdAt"),
    }
  }
}

const SEARCH_FIELDS: &[Field] = &[
  Field::At("$.name"),
  Field::At("$.description"),
  Field::At("$.country"),
  Field::At("$.headquarters.city"),
];

impl Resource for Producer {
  const KIND: EntityKind = EntityKind::Producer;

  type Draft = NewProducer;
  type Patch = ProducerPatch;
  type Sort = ProducerSort;

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn display_name(&self) -> &str { &self.name }

  fn search_fields() -> &'static [Field] { SEARCH_FIELDS }

  fn filter_terms(params: &QueryParams, errors: &mut ValidationErrors) -> Vec<Predicate> {
    let mut terms = Vec::new();
    if let Some(country) = params.get("country") {
      terms.push(Predicate::Contains(Field::At("$.country"), country.to_owned()));
    }
    if let Some(specialty) = params.parse_enum::<Specialty>("specialty", errors) {
      terms.push(Predicate::Equals(
        Field::Each("$.specialties"),
        Scalar::Text(specialty.to_string()),
      ));
    }
    terms
  }

  fn from_draft(draft: NewProducer, meta: Meta) -> Self {
    Self {
      meta,
      name: draft.name,
      description: draft.description,
      founded_year: draft.founded_year,
      country: draft.country,
      headquarters: draft.headquarters,
      contact: draft.contact,
      specialties: draft.specialties,
      budget: draft.budget,
    }
  }

  fn merge(&mut self, patch: ProducerPatch) {
    if let Some(v) = patch.name {
      self.name = v;
    }
    if let Some(v) = patch.description {
      self.description = Some(v);
    }
    if let Some(v) = patch.founded_year {
      self.founded_year = Some(v);
    }
    if let Some(v) = patch.country {
      self.country = Some(v);
    }
    if let Some(v) = patch.headquarters {
      self.headquarters = v;
    }
    if let Some(v) = patch.contact {
      self.contact = v;
    }
    if let Some(v) = patch.specialties {
      self.specialties = v;
    }
    if let Some(v) = patch.budget {
      self.budget = v;
    }
    if let Some(active) = patch.is_active {
      self.meta.is_active = active;
    }
  }

  fn normalize(&mut self) {
    validate::trim(&mut self.name);
    validate::trim_opt(&mut self.description);
    validate::trim_opt(&mut self.country);
    validate::trim_opt(&mut self.headquarters.city);
    validate::trim_opt(&mut self.headquarters.address);
    validate::trim_opt(&mut self.headquarters.zip_code);
    validate::trim_opt(&mut self.contact.website);
    validate::trim_opt(&mut self.contact.email);
    validate::trim_opt(&mut self.contact.phone);
    if let Some(email) = &mut self.contact.email {
      *email = email.to_lowercase();
    }
    validate::dedup(&mut self.specialties);
  }

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::required_text(&mut errors, "name", &self.name, 2, 100);
    validate::max_text(&mut errors, "description", self.description.as_deref(), 1000);
    validate::in_range(
      &mut errors,
      "foundedYear",
      self.founded_year,
      1800,
      validate::current_year(),
    );
    validate::url(&mut errors, "contact.website", self.contact.website.as_deref());
    if let Some(email) = &self.contact.email
      && !email.contains('@')
    {
      errors.push("contact.email", "must be an email address");
    }
    errors.finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::Owner;

  fn producer() -> Producer {
    Producer::from_draft(
      NewProducer {
        name:         "Syncopy".into(),
        description:  None,
        founded_year: Some(2001),
        country:      Some(" UK ".into()),
        headquarters: Headquarters::default(),
        contact:      Contact { email: Some("Info@Syncopy.example".into()), ..Default::default() },
        specialties:  vec![Specialty::Thriller, Specialty::Action, Specialty::Thriller],
        budget:       Budget::default(),
      },
      Meta::new(Owner::System),
    )
  }

  #[test]
  fn normalises_sets_and_contact() {
    let mut p = producer();
    p.normalize();
    assert_eq!(p.country.as_deref(), Some("UK"));
    assert_eq!(p.contact.email.as_deref(), Some("info@syncopy.example"));
    assert_eq!(p.specialties, [Specialty::Thriller, Specialty::Action]);
    assert!(p.validate().is_ok());
  }

  #[test]
  fn founded_year_and_email_are_checked() {
    let mut p = producer();
    p.founded_year = Some(1700);
    p.contact.email = Some("nope".into());
    let err = p.validate().unwrap_err();
    assert!(err.has("foundedYear"));
    assert!(err.has("contact.email"));
  }

  #[test]
  fn specialty_filter_rejects_unknown_values() {
    let mut errors = ValidationErrors::new();
    let params = QueryParams::new().with("specialty", "opera");
    assert!(Producer::filter_terms(&params, &mut errors).is_empty());
    assert!(errors.has("specialty"));
  }

  #[test]
  fn specialty_uses_snake_case() {
    assert_eq!(Specialty::ScienceFiction.to_string(), "science_fiction");
    assert_eq!(
      serde_json::to_value(Specialty::ScienceFiction).unwrap(),
      "science_fiction"
    );
  }
}

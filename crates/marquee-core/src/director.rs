//! Directors.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::{
  entity::{EntityKind, Meta},
  query::{Field, Predicate, QueryParams},
  resource::{Resource, SortKey},
  validate::{self, ValidationErrors},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
  pub name:     String,
  pub year:     Option<i32>,
  pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialMedia {
  pub website:   Option<String>,
  pub twitter:   Option<String>,
  pub instagram: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Director {
  #[serde(flatten)]
  pub meta:         Meta,
  pub name:         String,
  pub biography:    Option<String>,
  pub birth_date:   Option<NaiveDate>,
  pub nationality:  Option<String>,
  /// Ordered as supplied.
  #[serde(default)]
  pub awards:       Vec<Award>,
  #[serde(default)]
  pub social_media: SocialMedia,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirector {
  pub name:         String,
  pub biography:    Option<String>,
  pub birth_date:   Option<NaiveDate>,
  pub nationality:  Option<String>,
  #[serde(default)]
  pub awards:       Vec<Award>,
  #[serde(default)]
  pub social_media: SocialMedia,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorPatch {
  pub name:         Option<String>,
  pub biography:    Option<String>,
  pub birth_date:   Option<NaiveDate>,
  pub nationality:  Option<String>,
  pub awards:       Option<Vec<Award>>,
  pub social_media: Option<SocialMedia>,
  pub is_active:    Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum DirectorSort {
  #[default]
  Name,
  BirthDate,
  Nationality,
  CreatedAt,
}

impl SortKey for DirectorSort {
  fn field(self) -> Field {
    match self {
      DirectorSort::Name => Field::At("$.name"),
      DirectorSort::BirthDate => Field::At("$.birthDate"),
      DirectorSort::Nationality => Field::At("$.nationality"),
      DirectorSort::CreatedAt => Field::At("$.createdAt"),
    }
  }
}

const SEARCH_FIELDS: &[Field] = &[
  Field::At("$.name"),
  Field::At("$.biography"),
  Field::At("$.nationality"),
];

impl Resource for Director {
  const KIND: EntityKind = EntityKind::Director;

  type Draft = NewDirector;
  type Patch = DirectorPatch;
  type Sort = DirectorSort;

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn display_name(&self) -> &str { &self.name }

  fn search_fields() -> &'static [Field] { SEARCH_FIELDS }

  fn filter_terms(params: &QueryParams, _errors: &mut ValidationErrors) -> Vec<Predicate> {
    params
      .get("nationality")
      .map(|n| Predicate::Contains(Field::At("$.nationality"), n.to_owned()))
      .into_iter()
      .collect()
  }

  fn from_draft(draft: NewDirector, meta: Meta) -> Self {
    Self {
      meta,
      name: draft.name,
      biography: draft.biography,
      birth_date: draft.birth_date,
      nationality: draft.nationality,
      awards: draft.awards,
      social_media: draft.social_media,
    }
  }

  fn merge(&mut self, patch: DirectorPatch) {
    if let Some(v) = patch.name {
      self.name = v;
    }
    if let Some(v) = patch.biography {
      self.biography = Some(v);
    }
    if let Some(v) = patch.birth_date {
      self.birth_date = Some(v);
    }
    if let Some(v) = patch.nationality {
      self.nationality = Some(v);
    }
    if let Some(v) = patch.awards {
      self.awards = v;
    }
    if let Some(v) = patch.social_media {
      self.social_media = v;
    }
    if let Some(active) = patch.is_active {
      self.meta.is_active = active;
    }
  }

  fn normalize(&mut self) {
    validate::trim(&mut self.name);
    validate::trim_opt(&mut self.biography);
    validate::trim_opt(&mut self.nationality);
    for award in &mut self.awards {
      validate::trim(&mut award.name);
      validate::trim_opt(&mut award.category);
    }
    validate::trim_opt(&mut self.social_media.website);
    validate::trim_opt(&mut self.social_media.twitter);
    validate::trim_opt(&mut self.social_media.instagram);
  }

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::required_text(&mut errors, "name", &self.name, 2, 100);
    validate::max_text(&mut errors, "biography", self.biography.as_deref(), 2000);
    validate::max_text(&mut errors, "nationality", self.nationality.as_deref(), 50);
    if let Some(born) = self.birth_date
      && born > Utc::now().date_naive()
    {
      errors.push("birthDate", "cannot be in the future");
    }
    let this_year = validate::current_year();
    for (i, award) in self.awards.iter().enumerate() {
      if award.name.is_empty() {
        errors.push(format!("awards[{i}].name"), "is required");
      }
      validate::in_range(&mut errors, &format!("awards[{i}].year"), award.year, 1900, this_year);
    }
    validate::url(&mut errors, "socialMedia.website", self.social_media.website.as_deref());
    errors.finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::Owner;

  fn director() -> Director {
    Director::from_draft(
      NewDirector {
        name:         " Christopher Nolan ".into(),
        biography:    None,
        birth_date:   NaiveDate::from_ymd_opt(1970, 7, 30),
        nationality:  Some("British".into()),
        awards:       vec![Award {
          name:     "Oscar".into(),
          year:     Some(2024),
          category: Some("Best Director".into()),
        }],
        social_media: SocialMedia::default(),
      },
      Meta::new(Owner::System),
    )
  }

  #[test]
  fn valid_director() {
    let mut d = director();
    d.normalize();
    assert_eq!(d.name, "Christopher Nolan");
    assert!(d.validate().is_ok());
  }

  #[test]
  fn award_year_and_website_are_checked() {
    let mut d = director();
    d.awards[0].year = Some(1800);
    d.social_media.website = Some("nolan.example".into());
    let err = d.validate().unwrap_err();
    assert!(err.has("awards[0].year"));
    assert!(err.has("socialMedia.website"));
  }

  #[test]
  fn future_birth_date_is_rejected() {
    let mut d = director();
    d.birth_date = NaiveDate::from_ymd_opt(3000, 1, 1);
    assert!(d.validate().unwrap_err().has("birthDate"));
  }
}

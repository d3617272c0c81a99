//! Media: the movies and series themselves.
//!
//! Media is the only kind with outgoing references: one type, one director,
//! one producer and at least one genre. Those references are checked against
//! the store at write time and expanded to [`Summary`] values on read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};
use uuid::Uuid;

use crate::{
  entity::{Currency, EntityKind, Meta, Summary},
  query::{Field, Predicate, QueryParams, Scalar},
  resource::{Resource, SortKey},
  validate::{self, ValidationErrors},
};

// ─── Value types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImdbRating {
  pub score: Option<f64>,
  pub votes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
  pub imdb:            Option<ImdbRating>,
  /// 0–100.
  pub metacritic:      Option<f64>,
  /// 0–100.
  pub rotten_tomatoes: Option<f64>,
  /// Derived on save: mean of the available scores on a 0–10 scale.
  pub average:         Option<f64>,
}

impl Rating {
  fn recompute_average(&mut self) {
    let scores: Vec<f64> = [
      self.imdb.as_ref().and_then(|i| i.score),
      self.metacritic.map(|m| m / 10.0),
      self.rotten_tomatoes.map(|r| r / 10.0),
    ]
    .into_iter()
    .flatten()
    .collect();

    self.average = if scores.is_empty() {
      None
    } else {
      let mean = scores.iter().sum::<f64>() / scores.len() as f64;
      Some((mean * 10.0).round() / 10.0)
    };
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastRole {
  Lead,
  #[default]
  Supporting,
  Cameo,
  Voice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
  pub actor:     String,
  pub character: Option<String>,
  #[serde(default)]
  pub role:      CastRole,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewRole {
  Writer,
  Producer,
  Cinematographer,
  Composer,
  Editor,
  #[default]
  Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
  pub name: String,
  #[serde(default)]
  pub role: CrewRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
  pub amount:   f64,
  pub currency: Currency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technical {
  pub language:   Option<String>,
  #[serde(default)]
  pub subtitles:  Vec<String>,
  pub country:    Option<String>,
  pub budget:     Option<Money>,
  pub box_office: Option<Money>,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeriesStatus {
  Ongoing,
  Completed,
  Cancelled,
  Hiatus,
}

/// Seasons and episodes are either both known or both absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
  pub seasons:  Option<u32>,
  pub episodes: Option<u32>,
  pub status:   Option<SeriesStatus>,
}

// ─── Media ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
  #[serde(flatten)]
  pub meta:           Meta,
  pub title:          String,
  pub original_title: Option<String>,
  pub synopsis:       Option<String>,
  pub release_date:   Option<NaiveDate>,
  /// Minutes.
  pub duration:       Option<u32>,
  #[serde(rename = "type")]
  pub media_type:     Uuid,
  pub director:       Uuid,
  pub producer:       Uuid,
  pub genres:         Vec<Uuid>,
  #[serde(default)]
  pub rating:         Rating,
  #[serde(default)]
  pub cast:           Vec<CastMember>,
  #[serde(default)]
  pub crew:           Vec<CrewMember>,
  #[serde(default)]
  pub technical:      Technical,
  pub series_info:    Option<SeriesInfo>,
  pub poster:         Option<String>,
  pub trailer:        Option<String>,
  #[serde(default)]
  pub tags:           Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedia {
  pub title:          String,
  pub original_title: Option<String>,
  pub synopsis:       Option<String>,
  pub release_date:   Option<NaiveDate>,
  pub duration:       Option<u32>,
  #[serde(rename = "type")]
  pub media_type:     Uuid,
  pub director:       Uuid,
  pub producer:       Uuid,
  #[serde(default)]
  pub genres:         Vec<Uuid>,
  #[serde(default)]
  pub rating:         Rating,
  #[serde(default)]
  pub cast:           Vec<CastMember>,
  #[serde(default)]
  pub crew:           Vec<CrewMember>,
  #[serde(default)]
  pub technical:      Technical,
  pub series_info:    Option<SeriesInfo>,
  pub poster:         Option<String>,
  pub trailer:        Option<String>,
  #[serde(default)]
  pub tags:           Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPatch {
  pub title:          Option<String>,
  pub original_title: Option<String>,
  pub synopsis:       Option<String>,
  pub release_date:   Option<NaiveDate>,
  pub duration:       Option<u32>,
  #[serde(rename = "type")]
  pub media_type:     Option<Uuid>,
  pub director:       Option<Uuid>,
  pub producer:       Option<Uuid>,
  pub genres:         Option<Vec<Uuid>>,
  pub rating:         Option<Rating>,
  pub cast:           Option<Vec<CastMember>>,
  pub crew:           Option<Vec<CrewMember>>,
  pub technical:      Option<Technical>,
  pub series_info:    Option<SeriesInfo>,
  pub poster:         Option<String>,
  pub trailer:        Option<String>,
  pub tags:           Option<Vec<String>>,
  pub is_active:      Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "camelCase")]
pub enum MediaSort {
  #[default]
  Title,
  ReleaseDate,
  Duration,
  Rating,
  CreatedAt,
}

impl SortKey for MediaSort {
  fn field(self) -> Field {
    match self {
      MediaSort::Title => Field::At("$.title"),
      MediaSort::ReleaseDate => Field::At("$.releaseDate"),
      MediaSort::Duration => Field::At("$.duration"),
      MediaSort::Rating => Field::At("$.rating.average"),
      MediaSort::CreatedAt => Field::At("$.createdAt"),
    }
  }
}

const SEARCH_FIELDS: &[Field] = &[
  Field::At("$.title"),
  Field::At("$.originalTitle"),
  Field::At("$.synopsis"),
  Field::EachMember { array: "$.cast", member: "$.actor" },
  Field::Each("$.tags"),
];

fn reference_term(
  params: &QueryParams,
  key: &str,
  field: Field,
  errors: &mut ValidationErrors,
) -> Option<Predicate> {
  params
    .parse::<Uuid>(key, errors)
    .map(|id| Predicate::Equals(field, Scalar::Text(id.to_string())))
}

impl Resource for Media {
  const KIND: EntityKind = EntityKind::Media;

  type Draft = NewMedia;
  type Patch = MediaPatch;
  type Sort = MediaSort;

  fn meta(&self) -> &Meta { &self.meta }

  fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }

  fn display_name(&self) -> &str { &self.title }

  fn search_fields() -> &'static [Field] { SEARCH_FIELDS }

  fn filter_terms(params: &QueryParams, errors: &mut ValidationErrors) -> Vec<Predicate> {
    let mut terms: Vec<Predicate> = [
      reference_term(params, "genre", Field::Each("$.genres"), errors),
      reference_term(params, "director", Field::At("$.director"), errors),
      reference_term(params, "producer", Field::At("$.producer"), errors),
      reference_term(params, "type", Field::At("$.type"), errors),
    ]
    .into_iter()
    .flatten()
    .collect();

    if let Some(year) = params.parse::<i32>("year", errors) {
      match Predicate::calendar_year(Field::At("$.releaseDate"), year) {
        Some(term) => terms.push(term),
        None => errors.push("year", "out of range"),
      }
    }
    match params.parse::<f64>("rating", errors) {
      Some(min) if min.is_finite() => {
        terms.push(Predicate::AtLeast(Field::At("$.rating.average"), min));
      }
      Some(_) => errors.push("rating", "must be a finite number"),
      None => {}
    }
    if let Some(language) = params.get("language") {
      terms.push(Predicate::Contains(Field::At("$.technical.language"), language.to_owned()));
    }
    if let Some(status) = params.parse_enum::<SeriesStatus>("status", errors) {
      terms.push(Predicate::Equals(
        Field::At("$.seriesInfo.status"),
        Scalar::Text(status.to_string()),
      ));
    }
    terms
  }

  fn from_draft(draft: NewMedia, meta: Meta) -> Self {
    Self {
      meta,
      title: draft.title,
      original_title: draft.original_title,
      synopsis: draft.synopsis,
      release_date: draft.release_date,
      duration: draft.duration,
      media_type: draft.media_type,
      director: draft.director,
      producer: draft.producer,
      genres: draft.genres,
      rating: draft.rating,
      cast: draft.cast,
      crew: draft.crew,
      technical: draft.technical,
      series_info: draft.series_info,
      poster: draft.poster,
      trailer: draft.trailer,
      tags: draft.tags,
    }
  }

  fn merge(&mut self, patch: MediaPatch) {
    if let Some(v) = patch.title {
      self.title = v;
    }
    if let Some(v) = patch.original_title {
      self.original_title = Some(v);
    }
    if let Some(v) = patch.synopsis {
      self.synopsis = Some(v);
    }
    if let Some(v) = patch.release_date {
      self.release_date = Some(v);
    }
    if let Some(v) = patch.duration {
      self.duration = Some(v);
    }
    if let Some(v) = patch.media_type {
      self.media_type = v;
    }
    if let Some(v) = patch.director {
      self.director = v;
    }
    if let Some(v) = patch.producer {
      self.producer = v;
    }
    if let Some(v) = patch.genres {
      self.genres = v;
    }
    if let Some(v) = patch.rating {
      self.rating = v;
    }
    if let Some(v) = patch.cast {
      self.cast = v;
    }
    if let Some(v) = patch.crew {
      self.crew = v;
    }
    if let Some(v) = patch.technical {
      self.technical = v;
    }
    if let Some(v) = patch.series_info {
      self.series_info = Some(v);
    }
    if let Some(v) = patch.poster {
      self.poster = Some(v);
    }
    if let Some(v) = patch.trailer {
      self.trailer = Some(v);
    }
    if let Some(v) = patch.tags {
      self.tags = v;
    }
    if let Some(active) = patch.is_active {
      self.meta.is_active = active;
    }
  }

  fn normalize(&mut self) {
    validate::trim(&mut self.title);
    validate::trim_opt(&mut self.original_title);
    validate::trim_opt(&mut self.synopsis);
    validate::trim_opt(&mut self.poster);
    validate::trim_opt(&mut self.trailer);
    validate::trim_opt(&mut self.technical.language);
    validate::trim_opt(&mut self.technical.country);
    validate::normalize_tags(&mut self.tags);
    validate::dedup(&mut self.genres);
    for member in &mut self.cast {
      validate::trim(&mut member.actor);
      validate::trim_opt(&mut member.character);
    }
    for member in &mut self.crew {
      validate::trim(&mut member.name);
    }
    self.rating.recompute_average();
  }

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate::required_text(&mut errors, "title", &self.title, 1, 200);
    validate::max_text(&mut errors, "originalTitle", self.original_title.as_deref(), 200);
    validate::max_text(&mut errors, "synopsis", self.synopsis.as_deref(), 2000);
    validate::in_range(&mut errors, "duration", self.duration, 1, 1000);
    if self.genres.is_empty() {
      errors.push("genres", "at least one genre is required");
    }

    if let Some(imdb) = &self.rating.imdb {
      validate::in_range(&mut errors, "rating.imdb.score", imdb.score, 0.0, 10.0);
    }
    validate::in_range(&mut errors, "rating.metacritic", self.rating.metacritic, 0.0, 100.0);
    validate::in_range(
      &mut errors,
      "rating.rottenTomatoes",
      self.rating.rotten_tomatoes,
      0.0,
      100.0,
    );

    for (i, member) in self.cast.iter().enumerate() {
      if member.actor.is_empty() {
        errors.push(format!("cast[{i}].actor"), "is required");
      }
    }
    for (i, member) in self.crew.iter().enumerate() {
      if member.name.is_empty() {
        errors.push(format!("crew[{i}].name"), "is required");
      }
    }
    for (field, money) in [
      ("technical.budget", &self.technical.budget),
      ("technical.boxOffice", &self.technical.box_office),
    ] {
      if let Some(m) = money
        && m.amount < 0.0
      {
        errors.push(format!("{field}.amount"), "must not be negative");
      }
    }

    if let Some(info) = &self.series_info
      && info.seasons.is_some() != info.episodes.is_some()
    {
      errors.push("seriesInfo", "seasons and episodes must be given together");
    }

    validate::url(&mut errors, "poster", self.poster.as_deref());
    validate::url(&mut errors, "trailer", self.trailer.as_deref());
    errors.finish()
  }

  fn references(&self) -> Vec<(EntityKind, Uuid)> {
    let mut refs = vec![
      (EntityKind::Type, self.media_type),
      (EntityKind::Director, self.director),
      (EntityKind::Producer, self.producer),
    ];
    refs.extend(self.genres.iter().map(|g| (EntityKind::Genre, *g)));
    refs
  }
}

// ─── Expanded view ───────────────────────────────────────────────────────────

/// Media with its references expanded to display summaries. References that
/// no longer resolve are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
  #[serde(flatten)]
  pub media:     Media,
  pub populated: Populated,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Populated {
  #[serde(rename = "type")]
  pub media_type: Option<Summary>,
  pub director:   Option<Summary>,
  pub producer:   Option<Summary>,
  pub genres:     Vec<Summary>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::Owner;

  fn media() -> Media {
    Media::from_draft(
      NewMedia {
        title:          " Pulp Fiction ".into(),
        original_title: None,
        synopsis:       None,
        release_date:   NaiveDate::from_ymd_opt(1994, 10, 14),
        duration:       Some(154),
        media_type:     Uuid::new_v4(),
        director:       Uuid::new_v4(),
        producer:       Uuid::new_v4(),
        genres:         vec![Uuid::nil(), Uuid::nil()],
        rating:         Rating::default(),
        cast:           vec![],
        crew:           vec![],
        technical:      Technical::default(),
        series_info:    None,
        poster:         None,
        trailer:        None,
        tags:           vec!["Cult".into()],
      },
      Meta::new(Owner::System),
    )
  }

  #[test]
  fn average_is_derived_from_available_scores() {
    let mut m = media();
    m.rating = Rating {
      imdb:            Some(ImdbRating { score: Some(8.9), votes: Some(2_000_000) }),
      metacritic:      Some(95.0),
      rotten_tomatoes: None,
      average:         Some(1.0),
    };
    m.normalize();
    assert_eq!(m.rating.average, Some(9.2));

    m.rating = Rating::default();
    m.normalize();
    assert_eq!(m.rating.average, None);
  }

  #[test]
  fn normalisation_dedups_genres() {
    let mut m = media();
    m.normalize();
    assert_eq!(m.title, "Pulp Fiction");
    assert_eq!(m.genres, [Uuid::nil()]);
    assert_eq!(m.tags, ["cult"]);
    assert!(m.validate().is_ok());
  }

  #[test]
  fn series_info_needs_both_counts() {
    let mut m = media();
    m.series_info = Some(SeriesInfo { seasons: Some(3), episodes: None, status: None });
    assert!(m.validate().unwrap_err().has("seriesInfo"));

    m.series_info = Some(SeriesInfo {
      seasons:  None,
      episodes: None,
      status:   Some(SeriesStatus::Ongoing),
    });
    assert!(m.validate().is_ok());
  }

  #[test]
  fn genres_are_required() {
    let mut m = media();
    m.genres.clear();
    assert!(m.validate().unwrap_err().has("genres"));
  }

  #[test]
  fn references_cover_every_kind() {
    let m = media();
    let kinds: Vec<EntityKind> = m.references().into_iter().map(|(k, _)| k).collect();
    for kind in EntityKind::REFERENCABLE {
      assert!(kinds.contains(&kind));
    }
  }

  #[test]
  fn rating_filter_must_be_finite() {
    for raw in ["NaN", "inf", "-inf"] {
      let mut errors = ValidationErrors::new();
      let params = QueryParams::new().with("rating", raw);
      assert!(Media::filter_terms(&params, &mut errors).is_empty());
      assert!(errors.has("rating"), "{raw}");
    }

    let mut errors = ValidationErrors::new();
    let params = QueryParams::new().with("rating", "7.5");
    assert_eq!(
      Media::filter_terms(&params, &mut errors),
      [Predicate::AtLeast(Field::At("$.rating.average"), 7.5)]
    );
    assert!(!errors.has("rating"));
  }

  #[test]
  fn type_reference_is_serialised_as_type() {
    let json = serde_json::to_value(media()).unwrap();
    assert!(json.get("type").is_some());
    assert!(json.get("mediaType").is_none());
  }
}

//! Dashboard statistics: result shapes, the aggregation selectors a store
//! evaluates, and the fixed bucket boundaries for distributions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::Field;

// ─── Building blocks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub total:    u64,
  pub active:   u64,
  pub inactive: u64,
}

/// One row of a categorical breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
  pub value: String,
  pub count: u64,
}

/// A referenced entity ranked by how many active media point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked {
  pub id:    Uuid,
  pub name:  String,
  pub count: u64,
}

/// Aggregate over a numeric field; every member is `None` on an empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
  pub average: Option<f64>,
  pub min:     Option<f64>,
  pub max:     Option<f64>,
}

/// What to group by in a [`Tally`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
  Value(Field),
  /// The year component of an ISO date field.
  Year(Field),
}

/// What to aggregate in a [`Rollup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
  Value(Field),
  /// Whole years elapsed between an ISO date field and today.
  YearsSince(Field),
}

// ─── Per-resource reports ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreStats {
  #[serde(flatten)]
  pub counts:    StatusCounts,
  pub top_tags:  Vec<Tally>,
  pub most_used: Vec<Ranked>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorStats {
  #[serde(flatten)]
  pub counts:         StatusCounts,
  pub by_nationality: Vec<Tally>,
  pub most_prolific:  Vec<Ranked>,
  pub average_age:    Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerStats {
  #[serde(flatten)]
  pub counts:          StatusCounts,
  pub by_country:      Vec<Tally>,
  pub most_prolific:   Vec<Ranked>,
  pub by_founding_era: Vec<Tally>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypeStats {
  #[serde(flatten)]
  pub counts:      StatusCounts,
  pub by_category: Vec<Tally>,
  pub by_format:   Vec<Tally>,
  pub most_used:   Vec<Ranked>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStats {
  pub total_media:    u64,
  pub active_media:   u64,
  pub inactive_media: u64,
  pub top_directors:  Vec<Ranked>,
  pub top_genres:     Vec<Ranked>,
  pub top_producers:  Vec<Ranked>,
  pub rating:         Rollup,
  pub by_duration:    Vec<Tally>,
  pub by_year:        Vec<Tally>,
}

// ─── Buckets ─────────────────────────────────────────────────────────────────

pub const UNCLASSIFIED: &str = "unclassified";

pub const DURATION_BUCKETS: [&str; 5] = ["short", "standard", "long", "epic", UNCLASSIFIED];

pub const FOUNDING_ERAS: [&str; 5] = ["classic", "golden", "modern", "contemporary", UNCLASSIFIED];

/// Runtime in minutes. First matching bucket wins.
pub fn duration_bucket(minutes: Option<f64>) -> &'static str {
  match minutes {
    Some(m) if m <= 0.0 || m.is_nan() => UNCLASSIFIED,
    Some(m) if m < 60.0 => "short",
    Some(m) if m < 120.0 => "standard",
    Some(m) if m < 180.0 => "long",
    Some(_) => "epic",
    None => UNCLASSIFIED,
  }
}

/// Founding year of a producer. First matching bucket wins.
pub fn founding_era(year: Option<f64>) -> &'static str {
  match year {
    Some(y) if y < 1800.0 || y.is_nan() => UNCLASSIFIED,
    Some(y) if y < 1950.0 => "classic",
    Some(y) if y < 1980.0 => "golden",
    Some(y) if y < 2000.0 => "modern",
    Some(_) => "contemporary",
    None => UNCLASSIFIED,
  }
}

/// Count `values` into `labels` (in order, zero counts included) using
/// `classify`.
pub fn bucketize(
  values: &[Option<f64>],
  labels: &[&'static str],
  classify: fn(Option<f64>) -> &'static str,
) -> Vec<Tally> {
  let mut counts = vec![0u64; labels.len()];
  for value in values {
    let label = classify(*value);
    if let Some(i) = labels.iter().position(|l| *l == label) {
      counts[i] += 1;
    }
  }
  labels
    .iter()
    .zip(counts)
    .map(|(label, count)| Tally { value: (*label).to_owned(), count })
    .collect()
}

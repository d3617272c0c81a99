//! The resource query engine.
//!
//! Translates a loosely-typed map of query-string parameters into a
//! [`ListQuery`]: a conjunction of [`Predicate`]s plus pagination and an
//! allow-listed sort key. Storage backends compile the predicates; nothing
//! here touches a store, so every rejection happens before a query runs.

use std::{collections::HashMap, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::{
  resource::{Resource, SortKey},
  validate::ValidationErrors,
};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Rows to skip before `page`, or `None` when the offset does not fit a
/// signed 64-bit SQL `OFFSET`.
pub fn offset(page: u64, limit: u64) -> Option<u64> {
  page
    .checked_sub(1)
    .and_then(|p| p.checked_mul(limit))
    .filter(|skip| i64::try_from(*skip).is_ok())
}

// ─── Raw parameters ──────────────────────────────────────────────────────────

/// Query-string parameters exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
  pub fn new() -> Self { Self::default() }

  /// Builder-style insert, used for route presets like `/media/year/:year`.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  /// The trimmed value for `key`; blank values count as absent.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
  }

  /// Parse `key` with [`FromStr`], recording a field error on failure.
  pub fn parse<T: FromStr>(&self, key: &str, errors: &mut ValidationErrors) -> Option<T> {
    let raw = self.get(key)?;
    match raw.parse() {
      Ok(v) => Some(v),
      Err(_) => {
        errors.push(key, format!("invalid value {raw:?}"));
        None
      }
    }
  }

  /// Parse a closed enumeration, naming the allowed values on failure.
  pub fn parse_enum<T: FromStr + VariantNames>(
    &self,
    key: &str,
    errors: &mut ValidationErrors,
  ) -> Option<T> {
    let raw = self.get(key)?;
    match raw.parse() {
      Ok(v) => Some(v),
      Err(_) => {
        errors.push(key, format!("must be one of: {}", T::VARIANTS.join(", ")));
        None
      }
    }
  }

  fn positive(&self, key: &str, errors: &mut ValidationErrors) -> Option<u64> {
    let raw = self.get(key)?;
    match raw.parse::<u64>() {
      Ok(n) if n > 0 => Some(n),
      _ => {
        errors.push(key, "must be a positive integer");
        None
      }
    }
  }
}

impl From<HashMap<String, String>> for QueryParams {
  fn from(map: HashMap<String, String>) -> Self { Self(map) }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// A location inside an entity's JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  /// A scalar at a JSON path, e.g. `$.rating.average`.
  At(&'static str),
  /// Each element of an array of scalars, e.g. `$.tags`.
  Each(&'static str),
  /// A member of each element of an array of objects, e.g. `actor` in `$.cast`.
  EachMember {
    array:  &'static str,
    member: &'static str,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  Text(String),
  Integer(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// Equality on the `isActive` flag.
  Active(bool),
  Equals(Field, Scalar),
  /// Case-insensitive substring match.
  Contains(Field, String),
  /// Numeric greater-or-equal.
  AtLeast(Field, f64),
  /// Date within the half-open range `[from, until)`.
  Between {
    field: Field,
    from:  NaiveDate,
    until: NaiveDate,
  },
  /// Disjunction. An empty group matches nothing.
  AnyOf(Vec<Predicate>),
}

impl Predicate {
  /// `[year-01-01, (year+1)-01-01)`; `None` if the year is out of range.
  pub fn calendar_year(field: Field, year: i32) -> Option<Self> {
    let from = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let until = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;
    Some(Self::Between { field, from, until })
  }
}

// ─── Sorting and lifecycle selectors ─────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Order {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ActiveFilter {
  #[default]
  True,
  False,
  All,
}

impl ActiveFilter {
  pub fn as_flag(self) -> Option<bool> {
    match self {
      ActiveFilter::True => Some(true),
      ActiveFilter::False => Some(false),
      ActiveFilter::All => None,
    }
  }
}

// ─── ListQuery ───────────────────────────────────────────────────────────────

/// A validated listing request. `terms` are ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<K> {
  pub page:  u64,
  pub limit: u64,
  pub sort:  K,
  pub order: Order,
  pub terms: Vec<Predicate>,
}

impl<K> ListQuery<K> {
  pub fn skip(&self) -> u64 { self.page.saturating_sub(1).saturating_mul(self.limit) }
}

/// Build a [`ListQuery`] for resource `R`, collecting every malformed
/// parameter before failing. Unknown keys are ignored.
pub fn build_query<R: Resource>(
  params: &QueryParams,
) -> Result<ListQuery<R::Sort>, ValidationErrors> {
  let mut errors = ValidationErrors::new();

  let page = params.positive("page", &mut errors).unwrap_or(1);
  let limit = params
    .positive("limit", &mut errors)
    .unwrap_or(DEFAULT_LIMIT)
    .min(MAX_LIMIT);
  if offset(page, limit).is_none() {
    errors.push("page", "is too large");
  }
  let sort = params
    .parse_enum::<R::Sort>("sort", &mut errors)
    .unwrap_or_default();
  let order = params.parse_enum::<Order>("order", &mut errors).unwrap_or_default();
  let active = params
    .parse_enum::<ActiveFilter>("active", &mut errors)
    .unwrap_or_default();

  let mut terms = Vec::new();
  if let Some(flag) = active.as_flag() {
    terms.push(Predicate::Active(flag));
  }
  if let Some(text) = params.get("search") {
    terms.push(Predicate::AnyOf(
      R::search_fields()
        .iter()
        .map(|field| Predicate::Contains(*field, text.to_owned()))
        .collect(),
    ));
  }
  terms.extend(R::filter_terms(params, &mut errors));

  errors.finish()?;
  Ok(ListQuery { page, limit, sort, order, terms })
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub current_page:   u64,
  pub total_pages:    u64,
  pub total_items:    u64,
  pub items_per_page: u64,
  pub has_next_page:  bool,
  pub has_prev_page:  bool,
}

impl Pagination {
  pub fn new(page: u64, limit: u64, total: u64) -> Self {
    let total_pages = total.div_ceil(limit.max(1));
    Self {
      current_page: page,
      total_pages,
      total_items: total,
      items_per_page: limit,
      has_next_page: page < total_pages,
      has_prev_page: page > 1,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:      Vec<T>,
  pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    genre::{Genre, GenreSort},
    media::{Media, MediaSort},
  };

  fn params(pairs: &[(&str, &str)]) -> QueryParams { pairs.iter().copied().collect() }

  #[test]
  fn defaults() {
    let q = build_query::<Genre>(&QueryParams::new()).unwrap();
    assert_eq!(q.page, 1);
    assert_eq!(q.limit, DEFAULT_LIMIT);
    assert_eq!(q.sort, GenreSort::Name);
    assert_eq!(q.order, Order::Asc);
    assert_eq!(q.terms, vec![Predicate::Active(true)]);
    assert_eq!(q.skip(), 0);
  }

  #[test]
  fn limit_is_capped_not_rejected() {
    let q = build_query::<Genre>(&params(&[("limit", "500"), ("page", "3")])).unwrap();
    assert_eq!(q.limit, MAX_LIMIT);
    assert_eq!(q.skip(), 200);
  }

  #[test]
  fn bad_selectors_fail_fast_together() {
    let err = build_query::<Genre>(&params(&[
      ("sort", "password"),
      ("order", "sideways"),
      ("active", "maybe"),
      ("page", "0"),
    ]))
    .unwrap_err();
    assert!(err.has("sort"));
    assert!(err.has("order"));
    assert!(err.has("active"));
    assert!(err.has("page"));
  }

  #[test]
  fn huge_page_is_rejected_before_any_query() {
    let err = build_query::<Genre>(&params(&[("page", "18446744073709551615")])).unwrap_err();
    assert!(err.has("page"));

    let err =
      build_query::<Genre>(&params(&[("page", "9223372036854775810"), ("limit", "1")]))
        .unwrap_err();
    assert!(err.has("page"));
  }

  #[test]
  fn offset_stays_within_sql_range() {
    assert_eq!(offset(1, 10), Some(0));
    assert_eq!(offset(3, 100), Some(200));
    assert_eq!(offset(0, 10), None);
    assert_eq!(offset(u64::MAX, 10), None);
    assert_eq!(offset(i64::MAX as u64 + 1, 1), Some(i64::MAX as u64));
    assert_eq!(offset(i64::MAX as u64 + 2, 1), None);
  }

  #[test]
  fn active_all_drops_the_flag() {
    let q = build_query::<Genre>(&params(&[("active", "all")])).unwrap();
    assert!(q.terms.is_empty());

    let q = build_query::<Genre>(&params(&[("active", "false")])).unwrap();
    assert_eq!(q.terms, vec![Predicate::Active(false)]);
  }

  #[test]
  fn search_is_one_or_group() {
    let q = build_query::<Genre>(&params(&[("search", "  noir ")])).unwrap();
    let group = q
      .terms
      .iter()
      .find_map(|t| match t {
        Predicate::AnyOf(g) => Some(g),
        _ => None,
      })
      .unwrap();
    assert_eq!(group.len(), Genre::search_fields().len());
    assert!(group
      .iter()
      .all(|p| matches!(p, Predicate::Contains(_, s) if s == "noir")));
  }

  #[test]
  fn blank_search_is_ignored() {
    let q = build_query::<Genre>(&params(&[("search", "   ")])).unwrap();
    assert_eq!(q.terms, vec![Predicate::Active(true)]);
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let q = build_query::<Genre>(&params(&[("frobnicate", "yes")])).unwrap();
    assert_eq!(q.terms, vec![Predicate::Active(true)]);
  }

  #[test]
  fn media_year_and_rating() {
    let q = build_query::<Media>(&params(&[
      ("year", "1994"),
      ("rating", "8"),
      ("sort", "releaseDate"),
      ("order", "desc"),
    ]))
    .unwrap();
    assert_eq!(q.sort, MediaSort::ReleaseDate);
    assert_eq!(q.order, Order::Desc);
    assert!(q.terms.contains(&Predicate::Between {
      field: Field::At("$.releaseDate"),
      from:  NaiveDate::from_ymd_opt(1994, 1, 1).unwrap(),
      until: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
    }));
    assert!(q
      .terms
      .contains(&Predicate::AtLeast(Field::At("$.rating.average"), 8.0)));
  }

  #[test]
  fn media_rejects_malformed_filters() {
    let err = build_query::<Media>(&params(&[
      ("year", "nineteen"),
      ("director", "not-a-uuid"),
    ]))
    .unwrap_err();
    assert!(err.has("year"));
    assert!(err.has("director"));
  }

  #[test]
  fn pagination_metadata() {
    let p = Pagination::new(1, 10, 25);
    assert_eq!(p.total_pages, 3);
    assert!(p.has_next_page);
    assert!(!p.has_prev_page);

    let p = Pagination::new(3, 10, 25);
    assert!(!p.has_next_page);
    assert!(p.has_prev_page);

    let p = Pagination::new(1, 10, 0);
    assert_eq!(p.total_pages, 0);
    assert!(!p.has_next_page);
  }
}

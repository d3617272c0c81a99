//! The `CatalogStore` and `UserStore` traits.
//!
//! Implemented by storage backends (e.g. `marquee-store-sqlite`). The
//! [`Catalog`](crate::catalog::Catalog) service and the HTTP layer depend on
//! these abstractions, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  entity::{EntityKind, Summary},
  query::{Field, ListQuery, Predicate},
  resource::Resource,
  stats::{Dimension, Metric, Ranked, Rollup, StatusCounts, Tally},
  user::{User, UserStats},
};

/// Abstraction over catalog document storage.
///
/// Every method is a single read or a single write; the store offers no
/// multi-document transactions. All methods return `Send` futures so the
/// trait can be used behind `axum`.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new document. A natural-key collision is reported as an
  /// error convertible to [`Error::Conflict`](crate::Error::Conflict).
  fn insert<'a, R: Resource>(
    &'a self,
    doc: &'a R,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Unordered multi-insert. The outer result fails only when the store is
  /// unusable; each document gets its own inner result, in input order.
  fn insert_many<R: Resource>(
    &self,
    docs: Vec<R>,
  ) -> impl Future<Output = Result<Vec<Result<(), Self::Error>>, Self::Error>> + Send + '_;

  /// Overwrite an existing document. Returns `false` if it does not exist.
  fn replace<'a, R: Resource>(
    &'a self,
    doc: &'a R,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Physically delete a document. Returns `false` if it did not exist.
  fn remove(
    &self,
    kind: EntityKind,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get<R: Resource>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<R>, Self::Error>> + Send + '_;

  /// One page of documents matching every term of `query`, ordered by its
  /// sort field and then by id.
  fn find<'a, R: Resource>(
    &'a self,
    query: &'a ListQuery<R::Sort>,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + 'a;

  /// Number of documents matching every term.
  fn count<'a>(
    &'a self,
    kind: EntityKind,
    terms: &'a [Predicate],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Every active document, ordered by natural key.
  fn list_active<R: Resource>(
    &self,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Whether another document of `kind` already holds the case-folded
  /// natural `key`. For media only active rows count.
  fn key_taken<'a>(
    &'a self,
    kind: EntityKind,
    key: &'a str,
    except: Option<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The subset of `ids` with no document of `kind`, active or not.
  fn missing_ids(
    &self,
    kind: EntityKind,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Media referencing `id` through the reference field for `kind`.
  fn count_dependents(
    &self,
    kind: EntityKind,
    id: Uuid,
    active_only: bool,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// `{id, name}` for whichever of `ids` exist, in input order.
  fn summaries(
    &self,
    kind: EntityKind,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Summary>, Self::Error>> + Send + '_;

  // ── Aggregation ───────────────────────────────────────────────────────

  fn status_counts(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<StatusCounts, Self::Error>> + Send + '_;

  /// Top `limit` values of `dimension` over active documents, by count
  /// descending then value ascending. Missing values are skipped.
  fn tally(
    &self,
    kind: EntityKind,
    dimension: Dimension,
    limit: u64,
  ) -> impl Future<Output = Result<Vec<Tally>, Self::Error>> + Send + '_;

  /// Documents of `target` ranked by the number of active media pointing at
  /// them.
  fn rank_references(
    &self,
    target: EntityKind,
    limit: u64,
  ) -> impl Future<Output = Result<Vec<Ranked>, Self::Error>> + Send + '_;

  /// Average, minimum and maximum of `metric` over active documents.
  fn rollup(
    &self,
    kind: EntityKind,
    metric: Metric,
  ) -> impl Future<Output = Result<Rollup, Self::Error>> + Send + '_;

  /// Raw numeric values of `field` over active documents, for client-side
  /// bucketing. Non-numeric and missing values come back as `None`.
  fn values(
    &self,
    kind: EntityKind,
    field: Field,
  ) -> impl Future<Output = Result<Vec<Option<f64>>, Self::Error>> + Send + '_;
}

/// Abstraction over user account storage.
pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Persist a new account. Duplicate usernames or emails are reported as a
  /// conflict.
  fn create_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn user(&self, id: Uuid) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up by username or email, case-insensitively.
  fn user_by_login<'a>(
    &'a self,
    login: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn update_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete_user(&self, id: Uuid) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// A page of accounts, newest first, with the total count.
  fn list_users(
    &self,
    offset: u64,
    limit: u64,
  ) -> impl Future<Output = Result<(Vec<User>, u64), Self::Error>> + Send + '_;

  fn user_stats(&self) -> impl Future<Output = Result<UserStats, Self::Error>> + Send + '_;
}

//! Handlers shared by every catalog resource, parameterised over the
//! resource type.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/<resource>` | Query engine parameters |
//! | `GET`    | `/<resource>/active` | Unpaginated, sorted by name |
//! | `GET`    | `/<resource>/stats` | |
//! | `GET`    | `/<resource>/{id}` | 404 if not found |
//! | `POST`   | `/<resource>` | 201 |
//! | `PUT`    | `/<resource>/{id}` | Partial update |
//! | `DELETE` | `/<resource>/{id}` | Guarded soft delete |

use std::future::Future;

use axum::{Json, extract::State};
use marquee_core::{
  Result,
  actor::Actor,
  catalog::Catalog,
  director::Director,
  genre::Genre,
  media::Media,
  media_type::MediaType,
  producer::Producer,
  query::{Page, QueryParams},
  resource::Resource,
  stats::{DirectorStats, GenreStats, MediaStats, MediaTypeStats, ProducerStats},
  store::CatalogStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  envelope::{Created, Envelope, Reply, created, ok},
  extract::{Body, Params, Segment},
};

/// A resource exposed over HTTP, with its statistics report.
pub trait Endpoint: Resource {
  type Stats: Serialize + Send + 'static;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<Self::Stats>> + Send + '_;
}

impl Endpoint for Genre {
  type Stats = GenreStats;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<GenreStats>> + Send + '_ {
    catalog.genre_stats()
  }
}

impl Endpoint for Director {
  type Stats = DirectorStats;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<DirectorStats>> + Send + '_ {
    catalog.director_stats()
  }
}

impl Endpoint for Producer {
  type Stats = ProducerStats;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<ProducerStats>> + Send + '_ {
    catalog.producer_stats()
  }
}

impl Endpoint for MediaType {
  type Stats = MediaTypeStats;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<MediaTypeStats>> + Send + '_ {
    catalog.type_stats()
  }
}

impl Endpoint for Media {
  type Stats = MediaStats;

  fn stats<S: CatalogStore>(
    catalog: &Catalog<S>,
  ) -> impl Future<Output = Result<MediaStats>> + Send + '_ {
    catalog.media_stats()
  }
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /<resource>?page&limit&sort&order&active&search&…`
pub async fn list<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  Params(params): Params,
) -> Reply<Page<R>> {
  Ok(ok(state.catalog.list::<R>(&params).await?))
}

/// `GET /<resource>/active`
pub async fn active<R: Endpoint, S: Backend>(State(state): State<ApiState<S>>) -> Reply<Vec<R>> {
  Ok(ok(state.catalog.list_active::<R>().await?))
}

/// `GET /<resource>/stats`
pub async fn stats<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
) -> Reply<R::Stats> {
  Ok(ok(R::stats(&state.catalog).await?))
}

/// `GET /<resource>/{id}`
pub async fn get_one<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(id): Segment<Uuid>,
) -> Reply<R> {
  Ok(ok(state.catalog.get::<R>(id).await?))
}

/// Query-engine listing with one parameter fixed by the route, e.g.
/// `GET /directors/nationality/{value}`.
async fn listed_by<R: Endpoint, S: Backend>(
  state: &ApiState<S>,
  params: QueryParams,
  key: &'static str,
  value: String,
) -> Reply<Page<R>> {
  let params = params.with(key, value);
  Ok(ok(state.catalog.list::<R>(&params).await?))
}

/// `GET /directors/nationality/{nationality}`
pub async fn directors_by_nationality<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(value): Segment<String>,
  Params(params): Params,
) -> Reply<Page<Director>> {
  listed_by(&state, params, "nationality", value).await
}

/// `GET /producers/country/{country}`
pub async fn producers_by_country<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(value): Segment<String>,
  Params(params): Params,
) -> Reply<Page<Producer>> {
  listed_by(&state, params, "country", value).await
}

/// `GET /types/category/{category}`
pub async fn types_by_category<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(value): Segment<String>,
  Params(params): Params,
) -> Reply<Page<MediaType>> {
  listed_by(&state, params, "category", value).await
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /<resource>`
pub async fn create<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Body(draft): Body<R::Draft>,
) -> Created<R> {
  let doc = state.catalog.create::<R>(draft, &actor).await?;
  Ok(created(doc))
}

/// `PUT /<resource>/{id}`
pub async fn update<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  _actor: Actor,
  Segment(id): Segment<Uuid>,
  Body(patch): Body<R::Patch>,
) -> Reply<R> {
  Ok(ok(state.catalog.update::<R>(id, patch).await?))
}

/// `DELETE /<resource>/{id}`
pub async fn deactivate<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  _actor: Actor,
  Segment(id): Segment<Uuid>,
) -> Reply<R> {
  let doc = state.catalog.deactivate::<R>(id).await?;
  Ok(Json(Envelope::success(doc).with_message(format!("{} deactivated", R::KIND))))
}

/// `DELETE /genres/{id}/permanent`
pub async fn purge_genre<S: Backend>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Segment(id): Segment<Uuid>,
) -> Reply<Genre> {
  let genre = state.catalog.purge_genre(id, &actor).await?;
  Ok(Json(Envelope::success(genre).with_message("genre permanently deleted")))
}

//! Media reads, which expand references into `{id, name}` summaries.
//!
//! Writes, `active` and `stats` go through the generic handlers in
//! [`crate::resources`].

use axum::extract::State;
use marquee_core::{
  media::MediaView,
  query::{Page, QueryParams},
};
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  envelope::{Reply, ok},
  extract::{Params, Segment},
};

async fn expanded<S: Backend>(state: &ApiState<S>, params: &QueryParams) -> Reply<Page<MediaView>> {
  Ok(ok(state.catalog.list_media(params).await?))
}

/// `GET /media`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  Params(params): Params,
) -> Reply<Page<MediaView>> {
  expanded(&state, &params).await
}

/// `GET /media/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(id): Segment<Uuid>,
) -> Reply<MediaView> {
  Ok(ok(state.catalog.media_view(id).await?))
}

/// `GET /media/genre/{id}`
pub async fn by_genre<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(id): Segment<Uuid>,
  Params(params): Params,
) -> Reply<Page<MediaView>> {
  expanded(&state, &params.with("genre", id.to_string())).await
}

/// `GET /media/director/{id}`
pub async fn by_director<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(id): Segment<Uuid>,
  Params(params): Params,
) -> Reply<Page<MediaView>> {
  expanded(&state, &params.with("director", id.to_string())).await
}

/// `GET /media/year/{year}`
pub async fn by_year<S: Backend>(
  State(state): State<ApiState<S>>,
  Segment(year): Segment<i32>,
  Params(params): Params,
) -> Reply<Page<MediaView>> {
  expanded(&state, &params.with("year", year.to_string())).await
}

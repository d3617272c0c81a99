//! JSON REST API for Marquee.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`CatalogStore`] and [`UserStore`]. TLS and process concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = marquee_api::app(ApiState::new(store, auth, Environment::Production));
//! axum::serve(listener, app).await?;
//! ```

pub mod accounts;
pub mod auth;
pub mod bulk;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod media;
pub mod resources;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{Request, State},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{MethodRouter, delete, get, post, put},
};
use marquee_core::{
  catalog::Catalog,
  director::Director,
  genre::Genre,
  media::Media,
  media_type::MediaType,
  producer::Producer,
  store::{CatalogStore, UserStore},
};
use serde::Deserialize;
use serde_json::Value;
use strum::{Display, EnumString};
use tower_http::trace::TraceLayer;

pub use auth::AuthConfig;
pub use error::ApiError;

use envelope::Envelope;
use error::InternalDetail;
use resources::Endpoint;

/// A store usable by the whole API.
pub trait Backend: CatalogStore + UserStore + 'static {}

impl<T: CatalogStore + UserStore + 'static> Backend for T {}

/// Deployment environment. Outside production, 500 responses carry the
/// underlying error text in `error.details`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S> {
  pub catalog:     Catalog<S>,
  pub auth:        Arc<AuthConfig>,
  pub environment: Environment,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      catalog:     self.catalog.clone(),
      auth:        Arc::clone(&self.auth),
      environment: self.environment,
    }
  }
}

impl<S: Backend> ApiState<S> {
  pub fn new(store: Arc<S>, auth: AuthConfig, environment: Environment) -> Self {
    Self { catalog: Catalog::new(store), auth: Arc::new(auth), environment }
  }

  /// The account store, which is the same backend as the catalog's.
  pub fn users(&self) -> &S { self.catalog.store() }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The five standard routes plus `/bulk/<path>` for one resource. `list` and
/// `one` serve `GET /<path>` and `GET /<path>/{id}`.
fn resource<R: Endpoint, S: Backend>(
  path: &str,
  list: MethodRouter<ApiState<S>>,
  one: MethodRouter<ApiState<S>>,
) -> Router<ApiState<S>> {
  Router::new()
    .route(&format!("/{path}"), list.post(resources::create::<R, S>))
    .route(&format!("/{path}/active"), get(resources::active::<R, S>))
    .route(&format!("/{path}/stats"), get(resources::stats::<R, S>))
    .route(
      &format!("/{path}/{{id}}"),
      one
        .put(resources::update::<R, S>)
        .delete(resources::deactivate::<R, S>),
    )
    .route(&format!("/bulk/{path}"), post(bulk::ingest::<R, S>))
}

fn standard<R: Endpoint, S: Backend>(path: &str) -> Router<ApiState<S>> {
  resource::<R, S>(path, get(resources::list::<R, S>), get(resources::get_one::<R, S>))
}

/// Every API route, unprefixed and without middleware.
pub fn api_router<S: Backend>(state: ApiState<S>) -> Router<()> {
  Router::new()
    .merge(standard::<Genre, S>("genres"))
    .merge(standard::<Director, S>("directors"))
    .merge(standard::<Producer, S>("producers"))
    .merge(standard::<MediaType, S>("types"))
    .merge(resource::<Media, S>(
      "media",
      get(media::list::<S>),
      get(media::get_one::<S>),
    ))
    // Resource-specific
    .route("/genres/{id}/permanent", delete(resources::purge_genre::<S>))
    .route(
      "/directors/nationality/{nationality}",
      get(resources::directors_by_nationality::<S>),
    )
    .route("/producers/country/{country}", get(resources::producers_by_country::<S>))
    .route("/types/category/{category}", get(resources::types_by_category::<S>))
    .route("/media/genre/{id}", get(media::by_genre::<S>))
    .route("/media/director/{id}", get(media::by_director::<S>))
    .route("/media/year/{year}", get(media::by_year::<S>))
    .route("/bulk/all", post(bulk::ingest_all::<S>))
    // Accounts
    .route("/auth/register", post(accounts::register::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/refresh-token", post(accounts::refresh::<S>))
    .route("/auth/logout", post(accounts::logout::<S>))
    .route(
      "/auth/profile",
      get(accounts::profile).put(accounts::update_profile::<S>),
    )
    .route("/auth/change-password", put(accounts::change_password::<S>))
    .route("/auth/users", get(accounts::list_users::<S>))
    .route(
      "/auth/users/{id}",
      get(accounts::get_user::<S>)
        .put(accounts::update_user::<S>)
        .delete(accounts::delete_user::<S>),
    )
    .route("/auth/stats", get(accounts::stats::<S>))
    .with_state(state)
}

/// The complete application: routes under `/api`, request tracing, and
/// error-detail exposure outside production.
pub fn app<S: Backend>(state: ApiState<S>) -> Router {
  let environment = state.environment;
  Router::new()
    .nest("/api", api_router(state))
    .layer(middleware::from_fn_with_state(environment, reveal_internal_errors))
    .layer(TraceLayer::new_for_http())
}

/// Rewrite a 500 body to include the underlying error text.
async fn reveal_internal_errors(
  State(environment): State<Environment>,
  request: Request,
  next: Next,
) -> Response {
  let response = next.run(request).await;
  if environment == Environment::Production {
    return response;
  }
  let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned() else {
    return response;
  };
  let body = Envelope::<()>::failure("internal server error".to_owned(), Some(Value::String(detail)));
  (response.status(), Json(body)).into_response()
}

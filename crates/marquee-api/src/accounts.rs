//! Handlers for `/auth` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/auth/register` | 201; the first account becomes admin |
//! | `POST`   | `/auth/login` | Body: `{"email"\|"username", "password"}` |
//! | `POST`   | `/auth/refresh-token` | Rotates the refresh token |
//! | `POST`   | `/auth/logout` | Revokes the refresh token |
//! | `GET`    | `/auth/profile` | |
//! | `PUT`    | `/auth/profile` | |
//! | `PUT`    | `/auth/change-password` | |
//! | `GET`    | `/auth/users` | Admin; `?page&limit` |
//! | `GET`    | `/auth/users/{id}` | Admin |
//! | `PUT`    | `/auth/users/{id}` | Admin |
//! | `DELETE` | `/auth/users/{id}` | Admin |
//! | `GET`    | `/auth/stats` | Admin |

use axum::{Json, extract::State};
use chrono::Utc;
use marquee_core::{
  Error,
  actor::Role,
  query::{DEFAULT_LIMIT, MAX_LIMIT, Page, Pagination, offset},
  store::UserStore,
  user::{AdminUserPatch, Login, PasswordChange, ProfilePatch, Registration, User, UserStats},
  validate::ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  auth::{AdminUser, CurrentUser, TokenKind, TokenPair, hash_password, verify_password},
  envelope::{Created, Envelope, Reply, created, ok},
  error::ApiError,
  extract::{Body, Params, Segment},
};

/// An account together with a freshly issued token pair.
#[derive(Debug, Serialize)]
pub struct Session {
  pub user:   User,
  #[serde(flatten)]
  pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
  pub refresh_token: String,
}

/// Issue tokens for `user`, remember the refresh token and persist.
async fn open_session<S: Backend>(state: &ApiState<S>, mut user: User) -> Result<Session, ApiError> {
  let tokens = state.auth.tokens(&user)?;
  user.refresh_token = Some(tokens.refresh_token.clone());
  user.last_login = Some(Utc::now());
  user.touch();
  state.users().update_user(&user).await.map_err(ApiError::store)?;
  Ok(Session { user, tokens })
}

async fn load_user<S: Backend>(state: &ApiState<S>, id: Uuid) -> Result<User, ApiError> {
  state
    .users()
    .user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Core(Error::UserNotFound(id)))
}

async fn save_user<S: Backend>(state: &ApiState<S>, user: &User) -> Result<(), ApiError> {
  if state.users().update_user(user).await.map_err(ApiError::store)? {
    Ok(())
  } else {
    Err(ApiError::Core(Error::UserNotFound(user.id)))
  }
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// `POST /auth/register`
pub async fn register<S: Backend>(
  State(state): State<ApiState<S>>,
  Body(mut registration): Body<Registration>,
) -> Created<Session> {
  registration.normalize();
  registration.validate().map_err(Error::from)?;

  let hash = hash_password(&registration.password)?;
  let first = state.users().user_stats().await.map_err(ApiError::store)?.total == 0;
  let role = if first { Role::Admin } else { Role::User };

  let user = User::new(registration, hash, role);
  state.users().create_user(&user).await.map_err(ApiError::store)?;
  info!(user = %user.id, username = %user.username, %role, "registered account");

  Ok(created(open_session(&state, user).await?))
}

/// `POST /auth/login`
pub async fn login<S: Backend>(
  State(state): State<ApiState<S>>,
  Body(credentials): Body<Login>,
) -> Reply<Session> {
  let user = state
    .users()
    .user_by_login(&credentials.login)
    .await
    .map_err(ApiError::store)?
    .filter(|user| verify_password(&credentials.password, &user.password_hash))
    .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;
  if !user.is_active {
    return Err(ApiError::unauthorized("account is disabled"));
  }

  info!(user = %user.id, "login");
  Ok(ok(open_session(&state, user).await?))
}

/// `POST /auth/refresh-token`
pub async fn refresh<S: Backend>(
  State(state): State<ApiState<S>>,
  Body(request): Body<RefreshRequest>,
) -> Reply<TokenPair> {
  let claims = state.auth.verify(&request.refresh_token, TokenKind::Refresh)?;
  let user = state
    .users()
    .user(claims.sub)
    .await
    .map_err(ApiError::store)?
    .filter(|user| user.refresh_token.as_deref() == Some(request.refresh_token.as_str()))
    .ok_or_else(|| ApiError::unauthorized("refresh token has been revoked"))?;
  if !user.is_active {
    return Err(ApiError::unauthorized("account is disabled"));
  }

  Ok(ok(open_session(&state, user).await?.tokens))
}

/// `POST /auth/logout`
pub async fn logout<S: Backend>(
  State(state): State<ApiState<S>>,
  CurrentUser(mut user): CurrentUser,
) -> Reply<()> {
  user.refresh_token = None;
  user.touch();
  save_user(&state, &user).await?;
  info!(user = %user.id, "logout");
  Ok(Json(Envelope::done("logged out")))
}

// ─── Own account ──────────────────────────────────────────────────────────────

/// `GET /auth/profile`
pub async fn profile(CurrentUser(user): CurrentUser) -> Reply<User> { Ok(ok(user)) }

/// `PUT /auth/profile`
pub async fn update_profile<S: Backend>(
  State(state): State<ApiState<S>>,
  CurrentUser(mut user): CurrentUser,
  Body(patch): Body<ProfilePatch>,
) -> Reply<User> {
  user
    .apply_identity(patch.username, patch.email, patch.profile)
    .map_err(Error::from)?;
  user.touch();
  save_user(&state, &user).await?;
  Ok(ok(user))
}

/// `PUT /auth/change-password`. Also revokes the stored refresh token.
pub async fn change_password<S: Backend>(
  State(state): State<ApiState<S>>,
  CurrentUser(mut user): CurrentUser,
  Body(change): Body<PasswordChange>,
) -> Reply<()> {
  change.validate().map_err(Error::from)?;
  if !verify_password(&change.current_password, &user.password_hash) {
    return Err(Error::from(ValidationErrors::single("currentPassword", "is incorrect")).into());
  }

  user.password_hash = hash_password(&change.new_password)?;
  user.refresh_token = None;
  user.touch();
  save_user(&state, &user).await?;
  info!(user = %user.id, "password changed");
  Ok(Json(Envelope::done("password changed")))
}

// ─── Administration ───────────────────────────────────────────────────────────

/// `GET /auth/users?page&limit`
pub async fn list_users<S: Backend>(
  State(state): State<ApiState<S>>,
  _admin: AdminUser,
  Params(params): Params,
) -> Reply<Page<User>> {
  let mut errors = ValidationErrors::new();
  let page = params.parse::<u64>("page", &mut errors).unwrap_or(1);
  let limit = params.parse::<u64>("limit", &mut errors).unwrap_or(DEFAULT_LIMIT);
  if page == 0 {
    errors.push("page", "must be a positive integer");
  }
  if limit == 0 {
    errors.push("limit", "must be a positive integer");
  }
  let limit = limit.min(MAX_LIMIT);
  let skip = offset(page, limit);
  if page > 0 && skip.is_none() {
    errors.push("page", "is too large");
  }
  errors.finish().map_err(Error::from)?;

  let (items, total) = state
    .users()
    .list_users(skip.unwrap_or_default(), limit)
    .await
    .map_err(ApiError::store)?;
  Ok(ok(Page { items, pagination: Pagination::new(page, limit, total) }))
}

/// `GET /auth/users/{id}`
pub async fn get_user<S: Backend>(
  State(state): State<ApiState<S>>,
  _admin: AdminUser,
  Segment(id): Segment<Uuid>,
) -> Reply<User> {
  Ok(ok(load_user(&state, id).await?))
}

/// `PUT /auth/users/{id}`
pub async fn update_user<S: Backend>(
  State(state): State<ApiState<S>>,
  AdminUser(admin): AdminUser,
  Segment(id): Segment<Uuid>,
  Body(patch): Body<AdminUserPatch>,
) -> Reply<User> {
  if id == admin.id && (patch.role == Some(Role::User) || patch.is_active == Some(false)) {
    return Err(ApiError::BadRequest(
      "administrators cannot demote or deactivate themselves".to_owned(),
    ));
  }

  let mut user = load_user(&state, id).await?;
  user
    .apply_identity(patch.username, patch.email, patch.profile)
    .map_err(Error::from)?;
  if let Some(role) = patch.role {
    user.role = role;
  }
  if let Some(active) = patch.is_active {
    user.is_active = active;
    if !active {
      user.refresh_token = None;
    }
  }
  user.touch();
  save_user(&state, &user).await?;
  info!(user = %user.id, admin = %admin.id, "account updated by admin");
  Ok(ok(user))
}

/// `DELETE /auth/users/{id}`
pub async fn delete_user<S: Backend>(
  State(state): State<ApiState<S>>,
  AdminUser(admin): AdminUser,
  Segment(id): Segment<Uuid>,
) -> Reply<()> {
  if id == admin.id {
    return Err(ApiError::BadRequest(
      "administrators cannot delete their own account".to_owned(),
    ));
  }
  if !state.users().delete_user(id).await.map_err(ApiError::store)? {
    return Err(Error::UserNotFound(id).into());
  }
  info!(user = %id, admin = %admin.id, "account deleted");
  Ok(Json(Envelope::done("user deleted")))
}

/// `GET /auth/stats`
pub async fn stats<S: Backend>(
  State(state): State<ApiState<S>>,
  _admin: AdminUser,
) -> Reply<UserStats> {
  Ok(ok(state.users().user_stats().await.map_err(ApiError::store)?))
}

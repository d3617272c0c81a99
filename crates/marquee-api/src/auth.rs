//! Password hashing, JWT issue/verify, and the bearer-token extractors.
//!
//! Access and refresh tokens are both HS256 JWTs signed with the same
//! secret and told apart by their `kind` claim. The refresh token currently
//! honoured for an account is stored on the user record, so rotating or
//! clearing it there revokes the old one.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use marquee_core::{
  actor::{Actor, Role},
  store::UserStore,
  user::User,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, Backend, error::ApiError};

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// ─── Passwords ────────────────────────────────────────────────────────────────

/// Argon2 PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

// ─── Tokens ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  Uuid,
  pub role: Role,
  pub kind: TokenKind,
  pub iat:  i64,
  pub exp:  i64,
  /// Makes every token unique, even two issued in the same second.
  pub jti:  Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
  pub access_token:  String,
  pub refresh_token: String,
  /// Access token lifetime in seconds.
  pub expires_in:    i64,
}

/// Signing keys and token lifetimes.
#[derive(Clone)]
pub struct AuthConfig {
  encoding:             EncodingKey,
  decoding:             DecodingKey,
  pub access_ttl_secs:  i64,
  pub refresh_ttl_secs: i64,
}

impl AuthConfig {
  pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      access_ttl_secs,
      refresh_ttl_secs,
    }
  }

  pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let ttl = match kind {
      TokenKind::Access => self.access_ttl_secs,
      TokenKind::Refresh => self.refresh_ttl_secs,
    };
    let claims = Claims {
      sub: user.id,
      role: user.role,
      kind,
      iat: now,
      exp: now + ttl,
      jti: Uuid::new_v4(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
  }

  pub fn tokens(&self, user: &User) -> Result<TokenPair, ApiError> {
    Ok(TokenPair {
      access_token:  self.issue(user, TokenKind::Access)?,
      refresh_token: self.issue(user, TokenKind::Refresh)?,
      expires_in:    self.access_ttl_secs,
    })
  }

  /// Check signature, expiry and kind.
  pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
      .map_err(|e| ApiError::unauthorized(format!("invalid token: {e}")))?
      .claims;
    if claims.kind != kind {
      return Err(ApiError::unauthorized("wrong token type"));
    }
    Ok(claims)
  }
}

// ─── Extractors ───────────────────────────────────────────────────────────────

/// The token from an `Authorization: Bearer` header. A header in any other
/// shape is rejected rather than ignored.
fn bearer(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|token| Some(token.trim().to_owned()))
    .ok_or_else(|| ApiError::unauthorized("malformed authorization header"))
}

/// Resolve an access token to a live, active account.
async fn authenticate<S: Backend>(state: &ApiState<S>, token: &str) -> Result<User, ApiError> {
  let claims = state.auth.verify(token, TokenKind::Access)?;
  let user = state
    .users()
    .user(claims.sub)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::unauthorized("account no longer exists"))?;
  if !user.is_active {
    return Err(ApiError::unauthorized("account is disabled"));
  }
  Ok(user)
}

/// Optional auth: no header is the system actor, a bad token is a 401.
impl<S: Backend> FromRequestParts<ApiState<S>> for Actor {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    match bearer(&parts.headers)? {
      None => Ok(Actor::System),
      Some(token) => {
        let user = authenticate(state, &token).await?;
        Ok(Actor::User { id: user.id, role: user.role })
      }
    }
  }
}

/// The authenticated account. Missing credentials are a 401.
pub struct CurrentUser(pub User);

impl<S: Backend> FromRequestParts<ApiState<S>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers)?
      .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
    Ok(CurrentUser(authenticate(state, &token).await?))
  }
}

/// An authenticated administrator. Other accounts get a 403.
pub struct AdminUser(pub User);

impl<S: Backend> FromRequestParts<ApiState<S>> for AdminUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
    if user.role != Role::Admin {
      return Err(ApiError::forbidden("administrator role required"));
    }
    Ok(AdminUser(user))
  }
}

#[cfg(test)]
mod tests {
  use marquee_core::user::{Profile, Registration};

  use super::*;

  fn user(role: Role) -> User {
    User::new(
      Registration {
        username: "tester".into(),
        email:    "tester@example.com".into(),
        password: "secret1".into(),
        profile:  Profile::default(),
      },
      String::new(),
      role,
    )
  }

  #[test]
  fn password_roundtrip() {
    let hash = hash_password("hunter22").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter22", &hash));
    assert!(!verify_password("hunter23", &hash));
    assert!(!verify_password("hunter22", "not-a-phc-string"));
  }

  #[test]
  fn tokens_carry_identity_and_kind() {
    let auth = AuthConfig::new("test-secret", 60, 120);
    let u = user(Role::Admin);
    let pair = auth.tokens(&u).unwrap();

    let claims = auth.verify(&pair.access_token, TokenKind::Access).unwrap();
    assert_eq!(claims.sub, u.id);
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.exp - claims.iat, 60);

    assert!(auth.verify(&pair.refresh_token, TokenKind::Access).is_err());
    assert!(auth.verify(&pair.access_token, TokenKind::Refresh).is_err());
    assert_ne!(pair.refresh_token, auth.issue(&u, TokenKind::Refresh).unwrap());
  }

  #[test]
  fn foreign_signatures_are_rejected() {
    let ours = AuthConfig::new("ours", 60, 120);
    let theirs = AuthConfig::new("theirs", 60, 120);
    let token = theirs.issue(&user(Role::User), TokenKind::Access).unwrap();
    assert!(ours.verify(&token, TokenKind::Access).is_err());
  }

  #[test]
  fn expired_tokens_are_rejected() {
    let auth = AuthConfig::new("secret", -3600, 120);
    let token = auth.issue(&user(Role::User), TokenKind::Access).unwrap();
    assert!(auth.verify(&token, TokenKind::Access).is_err());
  }

  #[test]
  fn bearer_header_shapes() {
    let mut headers = HeaderMap::new();
    assert!(bearer(&headers).unwrap().is_none());

    headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
    assert_eq!(bearer(&headers).unwrap().as_deref(), Some("abc"));

    headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
    assert!(bearer(&headers).is_err());
  }
}

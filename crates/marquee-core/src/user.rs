//! User accounts and the request bodies of the auth routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  actor::Role,
  validate::{self, ValidationErrors},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub avatar:     Option<String>,
}

/// A stored account. Credentials never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            Uuid,
  pub username:      String,
  pub email:         String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role:          Role,
  pub is_active:     bool,
  pub profile:       Profile,
  pub last_login:    Option<DateTime<Utc>>,
  /// The single refresh token currently honoured for this account.
  #[serde(skip_serializing)]
  pub refresh_token: Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl User {
  pub fn new(registration: Registration, password_hash: String, role: Role) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      username: registration.username,
      email: registration.email,
      password_hash,
      role,
      is_active: true,
      profile: registration.profile,
      last_login: None,
      refresh_token: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
  pub total:    u64,
  pub active:   u64,
  pub inactive: u64,
  pub admins:   u64,
}

// ─── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub username: String,
  pub email:    String,
  pub password: String,
  #[serde(default)]
  pub profile:  Profile,
}

impl Registration {
  /// Trim the identity fields and lowercase the email.
  pub fn normalize(&mut self) {
    validate::trim(&mut self.username);
    self.email = self.email.trim().to_lowercase();
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    username(&mut errors, &self.username);
    email(&mut errors, &self.email);
    password(&mut errors, "password", &self.password);
    errors.finish()
  }
}

/// Username or email plus password.
#[derive(Debug, Clone, Deserialize)]
pub struct Login {
  #[serde(alias = "email", alias = "username")]
  pub login:    String,
  pub password: String,
}

/// Self-service profile update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
  pub username: Option<String>,
  pub email:    Option<String>,
  pub profile:  Option<Profile>,
}

/// Admin-only account update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPatch {
  pub username:  Option<String>,
  pub email:     Option<String>,
  pub profile:   Option<Profile>,
  pub role:      Option<Role>,
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
  pub current_password: String,
  pub new_password:     String,
}

impl PasswordChange {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    password(&mut errors, "newPassword", &self.new_password);
    errors.finish()
  }
}

impl User {
  /// Apply the identity and profile parts of an update, then re-validate.
  pub fn apply_identity(
    &mut self,
    username_patch: Option<String>,
    email_patch: Option<String>,
    profile_patch: Option<Profile>,
  ) -> Result<(), ValidationErrors> {
    if let Some(v) = username_patch {
      self.username = v.trim().to_owned();
    }
    if let Some(v) = email_patch {
      self.email = v.trim().to_lowercase();
    }
    if let Some(v) = profile_patch {
      self.profile = v;
    }
    let mut errors = ValidationErrors::new();
    username(&mut errors, &self.username);
    email(&mut errors, &self.email);
    validate::url(&mut errors, "profile.avatar", self.profile.avatar.as_deref());
    errors.finish()
  }
}

// ─── Field rules ─────────────────────────────────────────────────────────────

fn username(errors: &mut ValidationErrors, value: &str) {
  validate::required_text(errors, "username", value, 3, 30);
  if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    errors.push("username", "may only contain letters, digits and underscores");
  }
}

fn email(errors: &mut ValidationErrors, value: &str) {
  if value.is_empty() {
    errors.push("email", "is required");
  } else if !value.contains('@') {
    errors.push("email", "must be an email address");
  }
}

fn password(errors: &mut ValidationErrors, field: &str, value: &str) {
  if value.chars().count() < 6 {
    errors.push(field, "must be at least 6 characters");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration() -> Registration {
    Registration {
      username: " film_buff ".into(),
      email:    " Buff@Example.COM ".into(),
      password: "secret1".into(),
      profile:  Profile::default(),
    }
  }

  #[test]
  fn registration_is_normalised() {
    let mut r = registration();
    r.normalize();
    assert_eq!(r.username, "film_buff");
    assert_eq!(r.email, "buff@example.com");
    assert!(r.validate().is_ok());
  }

  #[test]
  fn registration_rules() {
    let mut r = registration();
    r.username = "a b".into();
    r.email = "nope".into();
    r.password = "123".into();
    let err = r.validate().unwrap_err();
    assert!(err.has("username"));
    assert!(err.has("email"));
    assert!(err.has("password"));
  }

  #[test]
  fn credentials_are_not_serialised() {
    let mut user = User::new(registration(), "hash".into(), Role::User);
    user.refresh_token = Some("token".into());
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("refreshToken").is_none());
    assert_eq!(json["role"], "user");
  }

  #[test]
  fn login_accepts_email_or_username() {
    let l: Login = serde_json::from_str(r#"{"email":"a@b.c","password":"x"}"#).unwrap();
    assert_eq!(l.login, "a@b.c");
    let l: Login = serde_json::from_str(r#"{"username":"abc","password":"x"}"#).unwrap();
    assert_eq!(l.login, "abc");
  }
}

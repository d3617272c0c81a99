//! The authenticated party behind a request.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::entity::Owner;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// Always present: requests without credentials act as [`Actor::System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  System,
  User { id: Uuid, role: Role },
}

impl Actor {
  /// The value stamped into `createdBy`.
  pub fn owner(&self) -> Owner {
    match self {
      Actor::System => Owner::System,
      Actor::User { id, .. } => Owner::User(*id),
    }
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Actor::System => None,
      Actor::User { id, .. } => Some(*id),
    }
  }

  pub fn is_admin(&self) -> bool { matches!(self, Actor::User { role: Role::Admin, .. }) }
}

//! Directory users and the explicit caller context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::Performer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Admin,
  Editor,
  Viewer,
}

/// A user directory entry. `supervisor_id` is the one-level reporting line
/// consulted only when authorizing a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
  pub user_id:       Uuid,
  pub role:          Role,
  pub supervisor_id: Option<Uuid>,
}

/// The resolved caller identity, passed explicitly into every engine
/// operation. Produced by the authentication layer, which is outside this
/// system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
  /// Network origin of the request, forwarded into audit entries.
  pub origin:  Option<String>,
}

impl Actor {
  pub fn new(user_id: Uuid, role: Role) -> Self {
    Self { user_id, role, origin: None }
  }

  pub fn with_origin(user_id: Uuid, role: Role, origin: impl Into<String>) -> Self {
    Self { user_id, role, origin: Some(origin.into()) }
  }

  pub fn performer(&self) -> Performer { Performer::User(self.user_id) }
}

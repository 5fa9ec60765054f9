//! Audit trail types.
//!
//! Entries are append-only: created once with a sink-assigned id and
//! timestamp, never mutated or deleted. Per-entity history is reconstructed
//! by sorting on `recorded_at`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
  Customer,
  Address,
  Identity,
  Relationship,
  Consent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
  Create,
  Update,
  Delete,
  Restore,
  Anonymize,
}

/// Who performed an action: a directory user, or the system itself for
/// operations with no attributable caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Performer {
  System,
  User(Uuid),
}

impl fmt::Display for Performer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::System => f.write_str("SYSTEM"),
      Self::User(id) => write!(f, "{id}"),
    }
  }
}

impl From<Performer> for String {
  fn from(p: Performer) -> Self { p.to_string() }
}

impl TryFrom<String> for Performer {
  type Error = uuid::Error;

  fn try_from(s: String) -> Result<Self, Self::Error> {
    if s == "SYSTEM" {
      Ok(Self::System)
    } else {
      Ok(Self::User(Uuid::parse_str(&s)?))
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub entry_id:     Uuid,
  pub entity_id:    Uuid,
  pub entity:       EntityKind,
  pub action:       AuditAction,
  pub performed_by: Performer,
  /// Free-text description of the change.
  pub note:         String,
  /// Network origin of the triggering request, when known.
  pub origin:       Option<String>,
  pub recorded_at:  DateTime<Utc>,
}

/// Input shape for [`crate::store::AuditSink::append`]; id and timestamp are
/// sink-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditEntry {
  pub entity_id:    Uuid,
  pub entity:       EntityKind,
  pub action:       AuditAction,
  pub performed_by: Performer,
  pub note:         String,
  pub origin:       Option<String>,
}

/// Parameters for [`crate::store::AuditSink::list`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
  pub entity_id: Option<Uuid>,
  pub action:    Option<AuditAction>,
  pub page:      Page,
}

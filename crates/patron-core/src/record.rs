//! Owned sub-records: addresses, identity documents, relationships and
//! consent grants.
//!
//! All four share one shape — owned by exactly one customer, created through
//! a `New*` input whose id and timestamps the store assigns — so one generic
//! [`RecordStore`](crate::store::RecordStore) capability covers them, keyed
//! by the [`OwnedRecord`] trait.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::EntityKind;

/// A record owned by exactly one customer.
pub trait OwnedRecord: Clone + Send + Sync + 'static {
  /// Input shape accepted by `RecordStore::create`.
  type New: Send + 'static;

  /// The entity kind written into audit entries for this record type.
  const ENTITY: EntityKind;

  fn record_id(&self) -> Uuid;
  fn owner_id(&self) -> Uuid;
}

// ─── Address ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
  Registered,
  Mailing,
  Headquarters,
  Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub address_id:   Uuid,
  pub customer_id:  Uuid,
  pub kind:         AddressKind,
  pub line1:        String,
  pub line2:        Option<String>,
  pub city:         String,
  pub district:     Option<String>,
  pub sub_district: Option<String>,
  pub region:       Option<String>,
  pub postal_code:  String,
  pub country:      String,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
  pub customer_id:  Uuid,
  pub kind:         AddressKind,
  pub line1:        String,
  pub line2:        Option<String>,
  pub city:         String,
  pub district:     Option<String>,
  pub sub_district: Option<String>,
  pub region:       Option<String>,
  pub postal_code:  String,
  pub country:      String,
}

impl OwnedRecord for Address {
  type New = NewAddress;

  const ENTITY: EntityKind = EntityKind::Address;

  fn record_id(&self) -> Uuid { self.address_id }

  fn owner_id(&self) -> Uuid { self.customer_id }
}

// ─── Identity document ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
  /// National-ID numbers must pass [`crate::citizen_id::validate`].
  NationalId,
  Passport,
  TaxId,
  Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDocument {
  pub identity_id:     Uuid,
  pub customer_id:     Uuid,
  pub kind:            IdentityKind,
  pub number:          String,
  pub issuing_country: Option<String>,
  pub expires_on:      Option<NaiveDate>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIdentityDocument {
  pub customer_id:     Uuid,
  pub kind:            IdentityKind,
  pub number:          String,
  pub issuing_country: Option<String>,
  pub expires_on:      Option<NaiveDate>,
}

impl OwnedRecord for IdentityDocument {
  type New = NewIdentityDocument;

  const ENTITY: EntityKind = EntityKind::Identity;

  fn record_id(&self) -> Uuid { self.identity_id }

  fn owner_id(&self) -> Uuid { self.customer_id }
}

// ─── Relationship ────────────────────────────────────────────────────────────

/// A directional link from the owning customer to another customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id:     Uuid,
  pub customer_id:         Uuid,
  pub related_customer_id: Uuid,
  /// Human-readable relation label, e.g. "director", "guarantor".
  pub role:                String,
  pub created_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
  pub customer_id:         Uuid,
  pub related_customer_id: Uuid,
  pub role:                String,
}

impl OwnedRecord for Relationship {
  type New = NewRelationship;

  const ENTITY: EntityKind = EntityKind::Relationship;

  fn record_id(&self) -> Uuid { self.relationship_id }

  fn owner_id(&self) -> Uuid { self.customer_id }
}

// ─── Consent ─────────────────────────────────────────────────────────────────

/// One grant or revocation of a consent topic. Strictly append-only: a
/// change of mind is a new row, never an update, so the full history is
/// preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consent {
  pub consent_id:     Uuid,
  pub customer_id:    Uuid,
  pub topic:          String,
  pub policy_version: String,
  pub granted:        bool,
  pub recorded_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConsent {
  pub customer_id:    Uuid,
  pub topic:          String,
  pub policy_version: String,
  pub granted:        bool,
}

impl OwnedRecord for Consent {
  type New = NewConsent;

  const ENTITY: EntityKind = EntityKind::Consent;

  fn record_id(&self) -> Uuid { self.consent_id }

  fn owner_id(&self) -> Uuid { self.customer_id }
}

//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as ISO
//! `YYYY-MM-DD`, UUIDs as hyphenated lowercase strings. Enum payloads that
//! carry data (the customer profile, address/identity kinds) are stored as
//! compact JSON; closed enums as their screaming-case discriminant.

use chrono::{DateTime, NaiveDate, Utc};
use patron_core::{
  audit::{AuditAction, AuditEntry, EntityKind, Performer},
  customer::{BusinessProfile, Customer, CustomerKind, CustomerStatus, Deletion, Profile},
  record::{Address, AddressKind, Consent, IdentityDocument, IdentityKind, Relationship},
  user::{DirectoryUser, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps and dates ────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date: {e}")))
}

// ─── Customer enums ──────────────────────────────────────────────────────────

pub fn encode_customer_kind(k: CustomerKind) -> &'static str {
  match k {
    CustomerKind::Personal => "PERSONAL",
    CustomerKind::Juristic => "JURISTIC",
  }
}

pub fn encode_status(s: CustomerStatus) -> &'static str {
  match s {
    CustomerStatus::Active => "ACTIVE",
    CustomerStatus::Inactive => "INACTIVE",
    CustomerStatus::Suspended => "SUSPENDED",
    CustomerStatus::Deceased => "DECEASED",
    CustomerStatus::Blacklisted => "BLACKLISTED",
    CustomerStatus::Anonymized => "ANONYMIZED",
  }
}

pub fn decode_status(s: &str) -> Result<CustomerStatus> {
  match s {
    "ACTIVE" => Ok(CustomerStatus::Active),
    "INACTIVE" => Ok(CustomerStatus::Inactive),
    "SUSPENDED" => Ok(CustomerStatus::Suspended),
    "DECEASED" => Ok(CustomerStatus::Deceased),
    "BLACKLISTED" => Ok(CustomerStatus::Blacklisted),
    "ANONYMIZED" => Ok(CustomerStatus::Anonymized),
    other => Err(Error::Decode(format!("unknown customer status: {other:?}"))),
  }
}

pub fn encode_profile(p: &Profile) -> Result<String> {
  Ok(serde_json::to_string(p)?)
}

pub fn decode_profile(s: &str) -> Result<Profile> {
  Ok(serde_json::from_str(s)?)
}

// ─── Sub-record enums ────────────────────────────────────────────────────────

pub fn encode_address_kind(k: &AddressKind) -> Result<String> {
  Ok(serde_json::to_string(k)?)
}

pub fn decode_address_kind(s: &str) -> Result<AddressKind> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_identity_kind(k: &IdentityKind) -> Result<String> {
  Ok(serde_json::to_string(k)?)
}

pub fn decode_identity_kind(s: &str) -> Result<IdentityKind> {
  Ok(serde_json::from_str(s)?)
}

// ─── Directory enums ─────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Admin => "ADMIN",
    Role::Editor => "EDITOR",
    Role::Viewer => "VIEWER",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "ADMIN" => Ok(Role::Admin),
    "EDITOR" => Ok(Role::Editor),
    "VIEWER" => Ok(Role::Viewer),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

// ─── Audit enums ─────────────────────────────────────────────────────────────

pub fn encode_action(a: AuditAction) -> &'static str {
  match a {
    AuditAction::Create => "CREATE",
    AuditAction::Update => "UPDATE",
    AuditAction::Delete => "DELETE",
    AuditAction::Restore => "RESTORE",
    AuditAction::Anonymize => "ANONYMIZE",
  }
}

pub fn decode_action(s: &str) -> Result<AuditAction> {
  match s {
    "CREATE" => Ok(AuditAction::Create),
    "UPDATE" => Ok(AuditAction::Update),
    "DELETE" => Ok(AuditAction::Delete),
    "RESTORE" => Ok(AuditAction::Restore),
    "ANONYMIZE" => Ok(AuditAction::Anonymize),
    other => Err(Error::Decode(format!("unknown audit action: {other:?}"))),
  }
}

pub fn encode_entity(e: EntityKind) -> &'static str {
  match e {
    EntityKind::Customer => "CUSTOMER",
    EntityKind::Address => "ADDRESS",
    EntityKind::Identity => "IDENTITY",
    EntityKind::Relationship => "RELATIONSHIP",
    EntityKind::Consent => "CONSENT",
  }
}

pub fn decode_entity(s: &str) -> Result<EntityKind> {
  match s {
    "CUSTOMER" => Ok(EntityKind::Customer),
    "ADDRESS" => Ok(EntityKind::Address),
    "IDENTITY" => Ok(EntityKind::Identity),
    "RELATIONSHIP" => Ok(EntityKind::Relationship),
    "CONSENT" => Ok(EntityKind::Consent),
    other => Err(Error::Decode(format!("unknown entity kind: {other:?}"))),
  }
}

pub fn encode_performer(p: Performer) -> String { p.to_string() }

pub fn decode_performer(s: &str) -> Result<Performer> {
  if s == "SYSTEM" {
    Ok(Performer::System)
  } else {
    Ok(Performer::User(decode_uuid(s)?))
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `customers` row.
pub struct RawCustomer {
  pub customer_id:         String,
  pub profile_json:        String,
  pub status:              String,
  pub membership_tier:     String,
  pub points_balance:      f64,
  pub lifetime_value:      f64,
  pub portfolio_size:      f64,
  pub last_transaction_at: Option<String>,
  pub preferred_channel:   Option<String>,
  pub high_value:          bool,
  pub created_at:          String,
  pub updated_at:          String,
  pub deleted_at:          Option<String>,
  pub deleted_by:          Option<String>,
}

impl RawCustomer {
  pub fn into_customer(self) -> Result<Customer> {
    let deleted = self
      .deleted_at
      .as_deref()
      .map(|at| -> Result<Deletion> {
        Ok(Deletion {
          at: decode_dt(at)?,
          by: self.deleted_by.as_deref().map(decode_uuid).transpose()?,
        })
      })
      .transpose()?;

    Ok(Customer {
      customer_id: decode_uuid(&self.customer_id)?,
      profile:     decode_profile(&self.profile_json)?,
      business:    BusinessProfile {
        status:              decode_status(&self.status)?,
        membership_tier:     self.membership_tier,
        points_balance:      self.points_balance,
        lifetime_value:      self.lifetime_value,
        portfolio_size:      self.portfolio_size,
        last_transaction_at: self
          .last_transaction_at
          .as_deref()
          .map(decode_dt)
          .transpose()?,
        preferred_channel:   self.preferred_channel,
        high_value:          self.high_value,
      },
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      deleted,
    })
  }
}

/// Raw strings read directly from an `addresses` row.
pub struct RawAddress {
  pub address_id:   String,
  pub customer_id:  String,
  pub kind:         String,
  pub line1:        String,
  pub line2:        Option<String>,
  pub city:         String,
  pub district:     Option<String>,
  pub sub_district: Option<String>,
  pub region:       Option<String>,
  pub postal_code:  String,
  pub country:      String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawAddress {
  pub fn into_address(self) -> Result<Address> {
    Ok(Address {
      address_id:   decode_uuid(&self.address_id)?,
      customer_id:  decode_uuid(&self.customer_id)?,
      kind:         decode_address_kind(&self.kind)?,
      line1:        self.line1,
      line2:        self.line2,
      city:         self.city,
      district:     self.district,
      sub_district: self.sub_district,
      region:       self.region,
      postal_code:  self.postal_code,
      country:      self.country,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:     String,
  pub customer_id:     String,
  pub kind:            String,
  pub number:          String,
  pub issuing_country: Option<String>,
  pub expires_on:      Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<IdentityDocument> {
    Ok(IdentityDocument {
      identity_id:     decode_uuid(&self.identity_id)?,
      customer_id:     decode_uuid(&self.customer_id)?,
      kind:            decode_identity_kind(&self.kind)?,
      number:          self.number,
      issuing_country: self.issuing_country,
      expires_on:      self.expires_on.as_deref().map(decode_date).transpose()?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `relationships` row.
pub struct RawRelationship {
  pub relationship_id:     String,
  pub customer_id:         String,
  pub related_customer_id: String,
  pub role:                String,
  pub created_at:          String,
}

impl RawRelationship {
  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id:     decode_uuid(&self.relationship_id)?,
      customer_id:         decode_uuid(&self.customer_id)?,
      related_customer_id: decode_uuid(&self.related_customer_id)?,
      role:                self.role,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `consents` row.
pub struct RawConsent {
  pub consent_id:     String,
  pub customer_id:    String,
  pub topic:          String,
  pub policy_version: String,
  pub granted:        bool,
  pub recorded_at:    String,
}

impl RawConsent {
  pub fn into_consent(self) -> Result<Consent> {
    Ok(Consent {
      consent_id:     decode_uuid(&self.consent_id)?,
      customer_id:    decode_uuid(&self.customer_id)?,
      topic:          self.topic,
      policy_version: self.policy_version,
      granted:        self.granted,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub role:          String,
  pub supervisor_id: Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<DirectoryUser> {
    Ok(DirectoryUser {
      user_id:       decode_uuid(&self.user_id)?,
      role:          decode_role(&self.role)?,
      supervisor_id: self.supervisor_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from an `audit_log` row.
pub struct RawAuditEntry {
  pub entry_id:     String,
  pub entity_id:    String,
  pub entity_type:  String,
  pub action:       String,
  pub performed_by: String,
  pub note:         String,
  pub origin:       Option<String>,
  pub recorded_at:  String,
}

impl RawAuditEntry {
  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      entry_id:     decode_uuid(&self.entry_id)?,
      entity_id:    decode_uuid(&self.entity_id)?,
      entity:       decode_entity(&self.entity_type)?,
      action:       decode_action(&self.action)?,
      performed_by: decode_performer(&self.performed_by)?,
      note:         self.note,
      origin:       self.origin,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

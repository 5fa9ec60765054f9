//! Customer — the aggregate the lifecycle engine governs.
//!
//! A customer is either a natural person or a juristic (corporate) entity.
//! The identifying payload lives in a tagged [`Profile`]; everything the
//! business tracks about the relationship lives in [`BusinessProfile`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerKind {
  Personal,
  Juristic,
}

/// Attributes of a natural person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
  pub first_name:    String,
  pub last_name:     String,
  pub title:         Option<String>,
  pub date_of_birth: Option<NaiveDate>,
  pub nationality:   Option<String>,
}

/// Attributes of a juristic (corporate) entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
  pub company_name:      String,
  pub registration_date: Option<NaiveDate>,
  pub industry_code:     Option<String>,
}

/// The identifying payload of a customer. The variant doubles as the
/// customer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profile {
  Personal(PersonProfile),
  Juristic(CompanyProfile),
}

impl Profile {
  pub fn kind(&self) -> CustomerKind {
    match self {
      Self::Personal(_) => CustomerKind::Personal,
      Self::Juristic(_) => CustomerKind::Juristic,
    }
  }

  /// The name search matches against: "First Last" for people, the company
  /// name for juristic entities.
  pub fn display_name(&self) -> String {
    match self {
      Self::Personal(p) => format!("{} {}", p.first_name, p.last_name),
      Self::Juristic(c) => c.company_name.clone(),
    }
  }
}

// ─── Business profile ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
  Active,
  Inactive,
  Suspended,
  Deceased,
  Blacklisted,
  /// Terminal status set by the anonymization operation. Distinct from
  /// [`CustomerStatus::Blacklisted`]; an anonymized remnant record is not a
  /// sanctioned customer.
  Anonymized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
  pub status:              CustomerStatus,
  pub membership_tier:     String,
  pub points_balance:      f64,
  pub lifetime_value:      f64,
  pub portfolio_size:      f64,
  pub last_transaction_at: Option<DateTime<Utc>>,
  pub preferred_channel:   Option<String>,
  pub high_value:          bool,
}

// ─── Customer ────────────────────────────────────────────────────────────────

/// Soft-delete metadata. Present iff the record is soft-deleted; `by` is
/// `None` only on legacy rows whose deleter was never recorded — the engine
/// always records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
  pub at: DateTime<Utc>,
  pub by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub customer_id: Uuid,
  pub profile:     Profile,
  pub business:    BusinessProfile,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub deleted:     Option<Deletion>,
}

impl Customer {
  pub fn kind(&self) -> CustomerKind { self.profile.kind() }

  pub fn is_deleted(&self) -> bool { self.deleted.is_some() }
}

/// Input shape for create and update. The id and timestamps are assigned by
/// the store; these are exactly the mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
  pub profile:  Profile,
  pub business: BusinessProfile,
}

impl NewCustomer {
  /// Reject inputs whose numeric balances are negative.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.business.portfolio_size < 0.0 {
      return Err(ValidationError::Invalid("portfolio size must not be negative"));
    }
    if self.business.points_balance < 0.0 {
      return Err(ValidationError::Invalid("points balance must not be negative"));
    }
    if self.business.lifetime_value < 0.0 {
      return Err(ValidationError::Invalid("lifetime value must not be negative"));
    }
    Ok(())
  }
}

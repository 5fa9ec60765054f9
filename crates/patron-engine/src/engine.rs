//! Customer lifecycle operations.

use std::sync::Arc;

use patron_core::{
  Error, PolicyError, Result, ValidationError,
  audit::{AuditAction, EntityKind, NewAuditEntry, Performer},
  customer::{CompanyProfile, Customer, CustomerStatus, NewCustomer, PersonProfile, Profile},
  store::{CustomerStore, MutableRecordStore, Page, UserDirectory},
  record::{Address, IdentityDocument, Relationship},
  user::Actor,
};
use uuid::Uuid;

use crate::recorder::AuditRecorder;

/// The customer lifecycle engine, generic over its store backend `S` and the
/// user directory `D`.
///
/// Cloning is cheap; the engine holds no state of its own.
#[derive(Clone)]
pub struct Engine<S, D> {
  pub(crate) store:     Arc<S>,
  pub(crate) directory: Arc<D>,
  pub(crate) audit:     AuditRecorder,
}

impl<S, D> Engine<S, D> {
  pub fn new(store: Arc<S>, directory: Arc<D>, audit: AuditRecorder) -> Self {
    Self { store, directory, audit }
  }

  pub(crate) fn record_audit(
    &self,
    entity_id: Uuid,
    entity: EntityKind,
    action: AuditAction,
    performed_by: Performer,
    note: &str,
    origin: Option<String>,
  ) {
    self.audit.record(NewAuditEntry {
      entity_id,
      entity,
      action,
      performed_by,
      note: note.to_owned(),
      origin,
    });
  }
}

impl<S, D> Engine<S, D>
where
  S: CustomerStore
    + MutableRecordStore<Address>
    + MutableRecordStore<IdentityDocument>
    + MutableRecordStore<Relationship>,
  D: UserDirectory,
{
  /// Persist a new customer and audit the creation under the acting user.
  pub async fn create(&self, actor: &Actor, input: NewCustomer) -> Result<Customer> {
    input.validate()?;
    let customer =
      CustomerStore::create(&*self.store, input).await.map_err(Error::store)?;

    tracing::info!(customer_id = %customer.customer_id, "customer created");
    self.record_audit(
      customer.customer_id,
      EntityKind::Customer,
      AuditAction::Create,
      actor.performer(),
      "created customer profile",
      actor.origin.clone(),
    );
    Ok(customer)
  }

  /// Fetch an active customer.
  pub async fn get(&self, id: Uuid) -> Result<Customer> {
    self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))
  }

  /// Replace the mutable fields of an active customer. The customer type is
  /// immutable: a personal profile can never become a juristic one.
  pub async fn update(
    &self,
    actor: &Actor,
    id: Uuid,
    input: NewCustomer,
  ) -> Result<Customer> {
    input.validate()?;
    let current = self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    if current.kind() != input.profile.kind() {
      return Err(ValidationError::Invalid("customer type is immutable").into());
    }

    let customer = self
      .store
      .update(id, input)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;

    self.record_audit(
      id,
      EntityKind::Customer,
      AuditAction::Update,
      actor.performer(),
      "updated customer profile",
      actor.origin.clone(),
    );
    Ok(customer)
  }

  /// Mark a customer deleted, recording the acting user as the deleter.
  /// Sub-records are left untouched. A second call finds no active record
  /// and fails with `NotFound`.
  pub async fn soft_delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
    self
      .store
      .soft_delete(id, actor.user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;

    tracing::info!(customer_id = %id, deleted_by = %actor.user_id, "customer soft-deleted");
    self.record_audit(
      id,
      EntityKind::Customer,
      AuditAction::Delete,
      actor.performer(),
      "soft-deleted customer",
      actor.origin.clone(),
    );
    Ok(())
  }

  /// Undo a soft delete.
  ///
  /// Only the original deleter or that deleter's direct supervisor may
  /// restore. A record whose deleter was never recorded cannot be restored
  /// at all, since the authorization cannot be verified. The store-side
  /// clear compares the expected deleter at write time, so a concurrent
  /// re-delete or restore surfaces as `NotFound` rather than being clobbered.
  pub async fn restore(&self, actor: &Actor, id: Uuid) -> Result<Customer> {
    let customer = self
      .store
      .get_any(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;

    let deleter = customer
      .deleted
      .as_ref()
      .and_then(|d| d.by)
      .ok_or(PolicyError::UnknownDeleter)?;

    if deleter != actor.user_id {
      let entry = match self.directory.get_user(deleter).await {
        Ok(Some(entry)) => entry,
        Ok(None) => return Err(PolicyError::UnverifiableDeleter.into()),
        Err(error) => {
          tracing::warn!(%error, deleter = %deleter, "user directory lookup failed");
          return Err(PolicyError::UnverifiableDeleter.into());
        },
      };
      if entry.supervisor_id != Some(actor.user_id) {
        return Err(Error::Forbidden(
          "only the deleter or their supervisor can restore",
        ));
      }
    }

    let restored = self
      .store
      .restore(id, deleter)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;

    tracing::info!(customer_id = %id, restored_by = %actor.user_id, "customer restored");
    self.record_audit(
      id,
      EntityKind::Customer,
      AuditAction::Restore,
      actor.performer(),
      "restored soft-deleted customer",
      actor.origin.clone(),
    );
    Ok(restored)
  }

  /// Irreversibly replace the customer's identifying fields with masked
  /// placeholders and purge PII-bearing sub-records.
  ///
  /// Refused while the customer has an active portfolio. Reaches
  /// soft-deleted customers too: an erasure request does not care that the
  /// record is parked. The mask is written before the purge, so a partial
  /// failure leaves no window of exposed PII and a retry completes the
  /// cascade. Consent rows are retained as non-identifying legal evidence.
  pub async fn anonymize(&self, id: Uuid) -> Result<Customer> {
    let customer = self
      .store
      .get_any(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;

    if customer.business.portfolio_size > 0.0 {
      return Err(PolicyError::ActivePortfolio.into());
    }

    let masked = masked_replacement(&customer);
    let updated = self
      .store
      .apply_anonymization(id, masked)
      .await
      .map_err(Error::store)?
      // The store re-checks the portfolio at write time; a lost race is the
      // same refusal as arriving late.
      .ok_or(Error::Policy(PolicyError::ActivePortfolio))?;

    let addresses = <S as MutableRecordStore<Address>>::purge_for(&*self.store, id)
      .await
      .map_err(Error::store)?;
    let identities =
      <S as MutableRecordStore<IdentityDocument>>::purge_for(&*self.store, id)
        .await
        .map_err(Error::store)?;
    let relationships =
      <S as MutableRecordStore<Relationship>>::purge_for(&*self.store, id)
        .await
        .map_err(Error::store)?;

    tracing::info!(
      customer_id = %id,
      addresses,
      identities,
      relationships,
      "customer anonymized"
    );
    self.record_audit(
      id,
      EntityKind::Customer,
      AuditAction::Anonymize,
      Performer::System,
      "anonymized customer profile",
      None,
    );
    Ok(updated)
  }

  /// Active customers, newest first.
  pub async fn list(&self, page: Page) -> Result<Vec<Customer>> {
    self.store.list(page).await.map_err(Error::store)
  }

  /// Soft-deleted customers, most recently deleted first.
  pub async fn list_deleted(&self, page: Page) -> Result<Vec<Customer>> {
    self.store.list_deleted(page).await.map_err(Error::store)
  }

  /// Case-insensitive substring search over person and company names.
  /// An empty result set is a valid answer, never an error.
  pub async fn search(&self, text: &str, page: Page) -> Result<Vec<Customer>> {
    self.store.search(text, page).await.map_err(Error::store)
  }
}

/// The non-reversible replacement written by [`Engine::anonymize`]. Masked
/// names embed a truncated id so remnant records stay unique without
/// identifying anyone.
fn masked_replacement(customer: &Customer) -> NewCustomer {
  let id = customer.customer_id.to_string();
  let tag = &id[..8];

  let profile = match &customer.profile {
    Profile::Personal(_) => Profile::Personal(PersonProfile {
      first_name:    format!("Deleted_User_{tag}"),
      last_name:     "Deleted".to_owned(),
      title:         None,
      date_of_birth: None,
      nationality:   None,
    }),
    Profile::Juristic(_) => Profile::Juristic(CompanyProfile {
      company_name:      format!("Deleted_Company_{tag}"),
      registration_date: None,
      industry_code:     None,
    }),
  };

  let mut business = customer.business.clone();
  business.status = CustomerStatus::Anonymized;
  business.preferred_channel = None;

  NewCustomer { profile, business }
}

//! Sub-record orchestration: addresses, identity documents, relationships
//! and consents.
//!
//! The four record types share one add/list/remove core over the generic
//! [`RecordStore`] capability; the typed wrappers add per-type validation
//! (identity checksums, duplicate numbers, self-referencing relationships).

use patron_core::{
  Error, PolicyError, Result, ValidationError,
  audit::AuditAction,
  citizen_id,
  record::{
    Address, Consent, IdentityDocument, IdentityKind, NewAddress, NewConsent,
    NewIdentityDocument, NewRelationship, OwnedRecord, Relationship,
  },
  store::{IdentityLookup, MutableRecordStore, RecordStore},
  user::Actor,
};
use uuid::Uuid;

use crate::engine::Engine;

impl<S, D> Engine<S, D> {
  // ── Generic core ──────────────────────────────────────────────────────────

  async fn add_record<R>(&self, actor: &Actor, input: R::New, note: &str) -> Result<R>
  where
    R: OwnedRecord,
    S: RecordStore<R>,
  {
    let record = <S as RecordStore<R>>::create(&*self.store, input)
      .await
      .map_err(Error::store)?;
    self.record_audit(
      record.record_id(),
      R::ENTITY,
      AuditAction::Create,
      actor.performer(),
      note,
      actor.origin.clone(),
    );
    Ok(record)
  }

  async fn list_records<R>(&self, customer_id: Uuid) -> Result<Vec<R>>
  where
    R: OwnedRecord,
    S: RecordStore<R>,
  {
    <S as RecordStore<R>>::list_for(&*self.store, customer_id)
      .await
      .map_err(Error::store)
  }

  async fn remove_record<R>(&self, actor: &Actor, id: Uuid, note: &str) -> Result<()>
  where
    R: OwnedRecord,
    S: MutableRecordStore<R>,
  {
    let removed = <S as MutableRecordStore<R>>::delete(&*self.store, id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    self.record_audit(
      removed.record_id(),
      R::ENTITY,
      AuditAction::Delete,
      actor.performer(),
      note,
      actor.origin.clone(),
    );
    Ok(())
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  pub async fn add_address(&self, actor: &Actor, input: NewAddress) -> Result<Address>
  where
    S: RecordStore<Address>,
  {
    self.add_record::<Address>(actor, input, "attached address").await
  }

  pub async fn list_addresses(&self, customer_id: Uuid) -> Result<Vec<Address>>
  where
    S: RecordStore<Address>,
  {
    self.list_records::<Address>(customer_id).await
  }

  pub async fn remove_address(&self, actor: &Actor, id: Uuid) -> Result<()>
  where
    S: MutableRecordStore<Address>,
  {
    self.remove_record::<Address>(actor, id, "removed address").await
  }

  // ── Identity documents ────────────────────────────────────────────────────

  /// Attach an identity document. National-ID numbers must pass the
  /// checksum; a number already registered to any customer is rejected.
  pub async fn add_identity(
    &self,
    actor: &Actor,
    input: NewIdentityDocument,
  ) -> Result<IdentityDocument>
  where
    S: IdentityLookup,
  {
    if input.kind == IdentityKind::NationalId {
      citizen_id::validate(&input.number)?;
    }
    if self
      .store
      .get_by_number(&input.number)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(PolicyError::DuplicateIdentity.into());
    }
    self
      .add_record::<IdentityDocument>(actor, input, "attached identity document")
      .await
  }

  pub async fn list_identities(&self, customer_id: Uuid) -> Result<Vec<IdentityDocument>>
  where
    S: RecordStore<IdentityDocument>,
  {
    self.list_records::<IdentityDocument>(customer_id).await
  }

  pub async fn remove_identity(&self, actor: &Actor, id: Uuid) -> Result<()>
  where
    S: MutableRecordStore<IdentityDocument>,
  {
    self
      .remove_record::<IdentityDocument>(actor, id, "removed identity document")
      .await
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  pub async fn add_relationship(
    &self,
    actor: &Actor,
    input: NewRelationship,
  ) -> Result<Relationship>
  where
    S: RecordStore<Relationship>,
  {
    if input.customer_id == input.related_customer_id {
      return Err(
        ValidationError::Invalid("relationship cannot reference its own customer").into(),
      );
    }
    if input.role.trim().is_empty() {
      return Err(ValidationError::Invalid("relationship role must not be empty").into());
    }
    self
      .add_record::<Relationship>(actor, input, "linked related customer")
      .await
  }

  pub async fn list_relationships(&self, customer_id: Uuid) -> Result<Vec<Relationship>>
  where
    S: RecordStore<Relationship>,
  {
    self.list_records::<Relationship>(customer_id).await
  }

  pub async fn remove_relationship(&self, actor: &Actor, id: Uuid) -> Result<()>
  where
    S: MutableRecordStore<Relationship>,
  {
    self
      .remove_record::<Relationship>(actor, id, "removed customer relationship")
      .await
  }

  // ── Consents ──────────────────────────────────────────────────────────────

  /// Record a consent grant or revocation. Strictly append-only: the history
  /// is never rewritten, a change of mind is a new row.
  pub async fn record_consent(&self, actor: &Actor, input: NewConsent) -> Result<Consent>
  where
    S: RecordStore<Consent>,
  {
    if input.topic.trim().is_empty() {
      return Err(ValidationError::Invalid("consent topic must not be empty").into());
    }
    let note = if input.granted { "recorded consent grant" } else { "recorded consent revocation" };
    self.add_record::<Consent>(actor, input, note).await
  }

  /// Consent history for a customer, newest first.
  pub async fn list_consents(&self, customer_id: Uuid) -> Result<Vec<Consent>>
  where
    S: RecordStore<Consent>,
  {
    self.list_records::<Consent>(customer_id).await
  }
}

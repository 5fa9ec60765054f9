//! Engine policy tests against in-memory mock collaborators.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Arc, Mutex},
};

use chrono::Utc;
use patron_core::{
  Error, PolicyError, ValidationError,
  audit::{AuditAction, AuditEntry, AuditFilter, EntityKind, NewAuditEntry, Performer},
  customer::{
    BusinessProfile, CompanyProfile, Customer, CustomerStatus, Deletion, NewCustomer,
    PersonProfile, Profile,
  },
  record::{
    Address, AddressKind, Consent, IdentityDocument, IdentityKind, NewAddress,
    NewConsent, NewIdentityDocument, NewRelationship, Relationship,
  },
  store::{
    AuditSink, CustomerStore, IdentityLookup, MutableRecordStore, Page, RecordStore,
    UserDirectory,
  },
  user::{Actor, DirectoryUser, Role},
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{AuditRecorder, Engine};

// ─── Mock store ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockStore {
  customers:     Mutex<HashMap<Uuid, Customer>>,
  addresses:     Mutex<Vec<Address>>,
  identities:    Mutex<Vec<IdentityDocument>>,
  relationships: Mutex<Vec<Relationship>>,
  consents:      Mutex<Vec<Consent>>,
}

impl CustomerStore for MockStore {
  type Error = Infallible;

  async fn create(&self, input: NewCustomer) -> Result<Customer, Infallible> {
    let now = Utc::now();
    let customer = Customer {
      customer_id: Uuid::new_v4(),
      profile:     input.profile,
      business:    input.business,
      created_at:  now,
      updated_at:  now,
      deleted:     None,
    };
    self
      .customers
      .lock()
      .unwrap()
      .insert(customer.customer_id, customer.clone());
    Ok(customer)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Customer>, Infallible> {
    let customers = self.customers.lock().unwrap();
    Ok(customers.get(&id).filter(|c| !c.is_deleted()).cloned())
  }

  async fn get_any(&self, id: Uuid) -> Result<Option<Customer>, Infallible> {
    Ok(self.customers.lock().unwrap().get(&id).cloned())
  }

  async fn update(
    &self,
    id: Uuid,
    input: NewCustomer,
  ) -> Result<Option<Customer>, Infallible> {
    let mut customers = self.customers.lock().unwrap();
    let Some(customer) = customers.get_mut(&id).filter(|c| !c.is_deleted()) else {
      return Ok(None);
    };
    customer.profile = input.profile;
    customer.business = input.business;
    customer.updated_at = Utc::now();
    Ok(Some(customer.clone()))
  }

  async fn soft_delete(&self, id: Uuid, by: Uuid) -> Result<Option<Deletion>, Infallible> {
    let mut customers = self.customers.lock().unwrap();
    let Some(customer) = customers.get_mut(&id).filter(|c| !c.is_deleted()) else {
      return Ok(None);
    };
    let deletion = Deletion { at: Utc::now(), by: Some(by) };
    customer.deleted = Some(deletion);
    Ok(Some(deletion))
  }

  async fn restore(
    &self,
    id: Uuid,
    expected_deleter: Uuid,
  ) -> Result<Option<Customer>, Infallible> {
    let mut customers = self.customers.lock().unwrap();
    let Some(customer) = customers.get_mut(&id) else { return Ok(None) };
    match customer.deleted {
      Some(d) if d.by == Some(expected_deleter) => {
        customer.deleted = None;
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
      },
      _ => Ok(None),
    }
  }

  async fn apply_anonymization(
    &self,
    id: Uuid,
    masked: NewCustomer,
  ) -> Result<Option<Customer>, Infallible> {
    let mut customers = self.customers.lock().unwrap();
    let Some(customer) = customers.get_mut(&id) else { return Ok(None) };
    if customer.business.portfolio_size > 0.0 {
      return Ok(None);
    }
    customer.profile = masked.profile;
    customer.business = masked.business;
    customer.updated_at = Utc::now();
    Ok(Some(customer.clone()))
  }

  async fn list(&self, _page: Page) -> Result<Vec<Customer>, Infallible> {
    let customers = self.customers.lock().unwrap();
    Ok(customers.values().filter(|c| !c.is_deleted()).cloned().collect())
  }

  async fn list_deleted(&self, _page: Page) -> Result<Vec<Customer>, Infallible> {
    let customers = self.customers.lock().unwrap();
    Ok(customers.values().filter(|c| c.is_deleted()).cloned().collect())
  }

  async fn search(&self, text: &str, _page: Page) -> Result<Vec<Customer>, Infallible> {
    let needle = text.to_lowercase();
    let customers = self.customers.lock().unwrap();
    Ok(
      customers
        .values()
        .filter(|c| !c.is_deleted())
        .filter(|c| c.profile.display_name().to_lowercase().contains(&needle))
        .cloned()
        .collect(),
    )
  }
}

impl RecordStore<Address> for MockStore {
  type Error = Infallible;

  async fn create(&self, input: NewAddress) -> Result<Address, Infallible> {
    let now = Utc::now();
    let address = Address {
      address_id:   Uuid::new_v4(),
      customer_id:  input.customer_id,
      kind:         input.kind,
      line1:        input.line1,
      line2:        input.line2,
      city:         input.city,
      district:     input.district,
      sub_district: input.sub_district,
      region:       input.region,
      postal_code:  input.postal_code,
      country:      input.country,
      created_at:   now,
      updated_at:   now,
    };
    self.addresses.lock().unwrap().push(address.clone());
    Ok(address)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Address>, Infallible> {
    let addresses = self.addresses.lock().unwrap();
    Ok(addresses.iter().filter(|a| a.customer_id == customer_id).cloned().collect())
  }
}

impl MutableRecordStore<Address> for MockStore {
  async fn delete(&self, id: Uuid) -> Result<Option<Address>, Infallible> {
    let mut addresses = self.addresses.lock().unwrap();
    let index = addresses.iter().position(|a| a.address_id == id);
    Ok(index.map(|i| addresses.remove(i)))
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64, Infallible> {
    let mut addresses = self.addresses.lock().unwrap();
    let before = addresses.len();
    addresses.retain(|a| a.customer_id != customer_id);
    Ok((before - addresses.len()) as u64)
  }
}

impl RecordStore<IdentityDocument> for MockStore {
  type Error = Infallible;

  async fn create(&self, input: NewIdentityDocument) -> Result<IdentityDocument, Infallible> {
    let now = Utc::now();
    let identity = IdentityDocument {
      identity_id:     Uuid::new_v4(),
      customer_id:     input.customer_id,
      kind:            input.kind,
      number:          input.number,
      issuing_country: input.issuing_country,
      expires_on:      input.expires_on,
      created_at:      now,
      updated_at:      now,
    };
    self.identities.lock().unwrap().push(identity.clone());
    Ok(identity)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<IdentityDocument>, Infallible> {
    let identities = self.identities.lock().unwrap();
    Ok(identities.iter().filter(|i| i.customer_id == customer_id).cloned().collect())
  }
}

impl MutableRecordStore<IdentityDocument> for MockStore {
  async fn delete(&self, id: Uuid) -> Result<Option<IdentityDocument>, Infallible> {
    let mut identities = self.identities.lock().unwrap();
    let index = identities.iter().position(|i| i.identity_id == id);
    Ok(index.map(|i| identities.remove(i)))
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64, Infallible> {
    let mut identities = self.identities.lock().unwrap();
    let before = identities.len();
    identities.retain(|i| i.customer_id != customer_id);
    Ok((before - identities.len()) as u64)
  }
}

impl IdentityLookup for MockStore {
  async fn get_by_number(&self, number: &str) -> Result<Option<IdentityDocument>, Infallible> {
    let identities = self.identities.lock().unwrap();
    Ok(identities.iter().find(|i| i.number == number).cloned())
  }
}

impl RecordStore<Relationship> for MockStore {
  type Error = Infallible;

  async fn create(&self, input: NewRelationship) -> Result<Relationship, Infallible> {
    let relationship = Relationship {
      relationship_id:     Uuid::new_v4(),
      customer_id:         input.customer_id,
      related_customer_id: input.related_customer_id,
      role:                input.role,
      created_at:          Utc::now(),
    };
    self.relationships.lock().unwrap().push(relationship.clone());
    Ok(relationship)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Relationship>, Infallible> {
    let relationships = self.relationships.lock().unwrap();
    Ok(relationships.iter().filter(|r| r.customer_id == customer_id).cloned().collect())
  }
}

impl MutableRecordStore<Relationship> for MockStore {
  async fn delete(&self, id: Uuid) -> Result<Option<Relationship>, Infallible> {
    let mut relationships = self.relationships.lock().unwrap();
    let index = relationships.iter().position(|r| r.relationship_id == id);
    Ok(index.map(|i| relationships.remove(i)))
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64, Infallible> {
    let mut relationships = self.relationships.lock().unwrap();
    let before = relationships.len();
    relationships.retain(|r| r.customer_id != customer_id);
    Ok((before - relationships.len()) as u64)
  }
}

impl RecordStore<Consent> for MockStore {
  type Error = Infallible;

  async fn create(&self, input: NewConsent) -> Result<Consent, Infallible> {
    let consent = Consent {
      consent_id:     Uuid::new_v4(),
      customer_id:    input.customer_id,
      topic:          input.topic,
      policy_version: input.policy_version,
      granted:        input.granted,
      recorded_at:    Utc::now(),
    };
    self.consents.lock().unwrap().push(consent.clone());
    Ok(consent)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Consent>, Infallible> {
    let consents = self.consents.lock().unwrap();
    Ok(consents.iter().filter(|c| c.customer_id == customer_id).cloned().collect())
  }
}

// ─── Mock directory ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("directory offline")]
struct DirectoryOffline;

#[derive(Default)]
struct MockDirectory {
  users:   Mutex<HashMap<Uuid, DirectoryUser>>,
  offline: bool,
}

impl MockDirectory {
  fn with_user(user: DirectoryUser) -> Self {
    let directory = Self::default();
    directory.users.lock().unwrap().insert(user.user_id, user);
    directory
  }

  fn offline() -> Self {
    Self { offline: true, ..Self::default() }
  }
}

impl UserDirectory for MockDirectory {
  type Error = DirectoryOffline;

  async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, DirectoryOffline> {
    if self.offline {
      return Err(DirectoryOffline);
    }
    Ok(self.users.lock().unwrap().get(&id).copied())
  }
}

// ─── Capture sink ────────────────────────────────────────────────────────────

#[derive(Default)]
struct CaptureSink {
  entries: Mutex<Vec<AuditEntry>>,
}

impl AuditSink for CaptureSink {
  type Error = Infallible;

  async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, Infallible> {
    let entry = AuditEntry {
      entry_id:     Uuid::new_v4(),
      entity_id:    entry.entity_id,
      entity:       entry.entity,
      action:       entry.action,
      performed_by: entry.performed_by,
      note:         entry.note,
      origin:       entry.origin,
      recorded_at:  Utc::now(),
    };
    self.entries.lock().unwrap().push(entry.clone());
    Ok(entry)
  }

  async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>, Infallible> {
    let entries = self.entries.lock().unwrap();
    Ok(
      entries
        .iter()
        .filter(|e| filter.entity_id.is_none_or(|id| e.entity_id == id))
        .filter(|e| filter.action.is_none_or(|a| e.action == a))
        .cloned()
        .collect(),
    )
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
  engine: Engine<MockStore, MockDirectory>,
  store:  Arc<MockStore>,
  sink:   Arc<CaptureSink>,
  worker: JoinHandle<()>,
}

fn harness_with(directory: MockDirectory) -> Harness {
  let store = Arc::new(MockStore::default());
  let sink = Arc::new(CaptureSink::default());
  let (recorder, worker) = AuditRecorder::spawn(sink.clone(), 16);
  let engine = Engine::new(store.clone(), Arc::new(directory), recorder);
  Harness { engine, store, sink, worker }
}

fn harness() -> Harness {
  harness_with(MockDirectory::default())
}

impl Harness {
  /// Drop the engine (and with it the queue's sender), wait for the worker
  /// to drain, and return the captured audit entries.
  async fn drain(self) -> Vec<AuditEntry> {
    drop(self.engine);
    self.worker.await.expect("audit worker");
    let entries = self.sink.entries.lock().unwrap();
    entries.clone()
  }
}

fn business(portfolio_size: f64) -> BusinessProfile {
  BusinessProfile {
    status: CustomerStatus::Active,
    membership_tier: "standard".to_owned(),
    points_balance: 120.0,
    lifetime_value: 4_500.0,
    portfolio_size,
    last_transaction_at: None,
    preferred_channel: Some("email".to_owned()),
    high_value: false,
  }
}

fn person(first: &str, last: &str, portfolio_size: f64) -> NewCustomer {
  NewCustomer {
    profile:  Profile::Personal(PersonProfile {
      first_name:    first.to_owned(),
      last_name:     last.to_owned(),
      title:         Some("Ms".to_owned()),
      date_of_birth: None,
      nationality:   Some("TH".to_owned()),
    }),
    business: business(portfolio_size),
  }
}

fn company(name: &str) -> NewCustomer {
  NewCustomer {
    profile:  Profile::Juristic(CompanyProfile {
      company_name:      name.to_owned(),
      registration_date: None,
      industry_code:     Some("6419".to_owned()),
    }),
    business: business(0.0),
  }
}

fn editor(user_id: Uuid) -> Actor {
  Actor::new(user_id, Role::Editor)
}

const VALID_CITIZEN_ID: &str = "1101100000001";

// ─── Customer lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trip() {
  let h = harness();
  let input = person("John", "Doe", 0.0);

  let created = h.engine.create(&editor(Uuid::new_v4()), input.clone()).await.unwrap();
  let fetched = h.engine.get(created.customer_id).await.unwrap();

  assert_eq!(fetched.profile, input.profile);
  assert_eq!(fetched.business, input.business);
  assert_eq!(fetched.customer_id, created.customer_id);
  assert!(fetched.deleted.is_none());
}

#[tokio::test]
async fn create_rejects_negative_portfolio() {
  let h = harness();
  let input = person("John", "Doe", -1.0);

  let result = h.engine.create(&editor(Uuid::new_v4()), input).await;
  assert!(matches!(
    result,
    Err(Error::Validation(ValidationError::Invalid(_)))
  ));
}

#[tokio::test]
async fn update_missing_customer_is_not_found() {
  let h = harness();
  let id = Uuid::new_v4();

  let result = h.engine.update(&editor(Uuid::new_v4()), id, person("A", "B", 0.0)).await;
  assert!(matches!(result, Err(Error::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn update_cannot_change_customer_type() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();

  let result = h.engine.update(&actor, created.customer_id, company("Acme Ltd")).await;
  assert!(matches!(result, Err(Error::Validation(ValidationError::Invalid(_)))));

  let unchanged = h.engine.get(created.customer_id).await.unwrap();
  assert_eq!(unchanged.profile, created.profile);
}

#[tokio::test]
async fn soft_delete_hides_customer_and_records_deleter() {
  let h = harness();
  let deleter = Uuid::new_v4();
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();

  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let result = h.engine.get(created.customer_id).await;
  assert!(matches!(result, Err(Error::NotFound(_))));

  let parked = h.store.get_any(created.customer_id).await.unwrap().unwrap();
  assert_eq!(parked.deleted.unwrap().by, Some(deleter));
}

#[tokio::test]
async fn second_soft_delete_is_not_found_and_keeps_deleter() {
  let h = harness();
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();
  let created = h.engine.create(&editor(first), person("John", "Doe", 0.0)).await.unwrap();

  h.engine.soft_delete(&editor(first), created.customer_id).await.unwrap();
  let result = h.engine.soft_delete(&editor(second), created.customer_id).await;

  assert!(matches!(result, Err(Error::NotFound(_))));
  let parked = h.store.get_any(created.customer_id).await.unwrap().unwrap();
  assert_eq!(parked.deleted.unwrap().by, Some(first));
}

// ─── Restore authorization ───────────────────────────────────────────────────

#[tokio::test]
async fn deleter_can_restore_their_own_deletion() {
  let h = harness();
  let deleter = Uuid::new_v4();
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let restored = h.engine.restore(&editor(deleter), created.customer_id).await.unwrap();
  assert!(restored.deleted.is_none());
  assert!(h.engine.get(created.customer_id).await.is_ok());
}

#[tokio::test]
async fn supervisor_of_deleter_can_restore() {
  let deleter = Uuid::new_v4();
  let supervisor = Uuid::new_v4();
  let h = harness_with(MockDirectory::with_user(DirectoryUser {
    user_id:       deleter,
    role:          Role::Editor,
    supervisor_id: Some(supervisor),
  }));
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let restored = h.engine.restore(&editor(supervisor), created.customer_id).await.unwrap();
  assert!(restored.deleted.is_none());
}

#[tokio::test]
async fn stranger_cannot_restore() {
  let deleter = Uuid::new_v4();
  let supervisor = Uuid::new_v4();
  let h = harness_with(MockDirectory::with_user(DirectoryUser {
    user_id:       deleter,
    role:          Role::Editor,
    supervisor_id: Some(supervisor),
  }));
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let result = h.engine.restore(&editor(Uuid::new_v4()), created.customer_id).await;
  assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn restore_with_unknown_deleter_is_a_policy_violation() {
  let h = harness();
  let now = Utc::now();
  let id = Uuid::new_v4();
  // A legacy row: soft-deleted, but nobody recorded the deleter.
  h.store.customers.lock().unwrap().insert(id, Customer {
    customer_id: id,
    profile:     person("John", "Doe", 0.0).profile,
    business:    business(0.0),
    created_at:  now,
    updated_at:  now,
    deleted:     Some(Deletion { at: now, by: None }),
  });

  let result = h.engine.restore(&editor(Uuid::new_v4()), id).await;
  assert!(matches!(result, Err(Error::Policy(PolicyError::UnknownDeleter))));
}

#[tokio::test]
async fn restore_fails_closed_when_deleter_is_not_in_directory() {
  let h = harness();
  let deleter = Uuid::new_v4();
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let result = h.engine.restore(&editor(Uuid::new_v4()), created.customer_id).await;
  assert!(matches!(
    result,
    Err(Error::Policy(PolicyError::UnverifiableDeleter))
  ));
}

#[tokio::test]
async fn restore_fails_closed_when_directory_is_offline() {
  let deleter = Uuid::new_v4();
  let h = harness_with(MockDirectory::offline());
  let created = h.engine.create(&editor(deleter), person("John", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&editor(deleter), created.customer_id).await.unwrap();

  let result = h.engine.restore(&editor(Uuid::new_v4()), created.customer_id).await;
  assert!(matches!(
    result,
    Err(Error::Policy(PolicyError::UnverifiableDeleter))
  ));

  // The deleter's own restore never consults the directory.
  let restored = h.engine.restore(&editor(deleter), created.customer_id).await.unwrap();
  assert!(restored.deleted.is_none());
}

// ─── Anonymization ───────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymize_masks_pii_and_purges_sub_records() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();
  let other = h.engine.create(&actor, company("Acme Ltd")).await.unwrap();
  let id = created.customer_id;

  h.engine
    .add_address(&actor, NewAddress {
      customer_id:  id,
      kind:         AddressKind::Registered,
      line1:        "1 High St".to_owned(),
      line2:        None,
      city:         "Bangkok".to_owned(),
      district:     None,
      sub_district: None,
      region:       None,
      postal_code:  "10110".to_owned(),
      country:      "TH".to_owned(),
    })
    .await
    .unwrap();
  h.engine
    .add_identity(&actor, NewIdentityDocument {
      customer_id:     id,
      kind:            IdentityKind::NationalId,
      number:          VALID_CITIZEN_ID.to_owned(),
      issuing_country: Some("TH".to_owned()),
      expires_on:      None,
    })
    .await
    .unwrap();
  h.engine
    .add_relationship(&actor, NewRelationship {
      customer_id:         id,
      related_customer_id: other.customer_id,
      role:                "director".to_owned(),
    })
    .await
    .unwrap();
  h.engine
    .record_consent(&actor, NewConsent {
      customer_id:    id,
      topic:          "marketing".to_owned(),
      policy_version: "2024-01".to_owned(),
      granted:        true,
    })
    .await
    .unwrap();

  let anonymized = h.engine.anonymize(id).await.unwrap();

  let Profile::Personal(profile) = &anonymized.profile else {
    panic!("profile variant must be preserved");
  };
  assert!(profile.first_name.starts_with("Deleted_User_"));
  assert_ne!(profile.first_name, "John");
  assert_eq!(profile.last_name, "Deleted");
  assert!(profile.date_of_birth.is_none());
  assert!(profile.nationality.is_none());
  assert_eq!(anonymized.business.status, CustomerStatus::Anonymized);

  assert!(h.engine.list_addresses(id).await.unwrap().is_empty());
  assert!(h.engine.list_identities(id).await.unwrap().is_empty());
  assert!(h.engine.list_relationships(id).await.unwrap().is_empty());
  // Consent history stays: it is the non-identifying legal evidence.
  assert_eq!(h.engine.list_consents(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn anonymize_with_active_portfolio_leaves_record_untouched() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 5.0)).await.unwrap();

  let result = h.engine.anonymize(created.customer_id).await;
  assert!(matches!(result, Err(Error::Policy(PolicyError::ActivePortfolio))));

  let unchanged = h.store.get_any(created.customer_id).await.unwrap().unwrap();
  assert_eq!(unchanged.profile, created.profile);
  assert_eq!(unchanged.business, created.business);
}

#[tokio::test]
async fn anonymize_reaches_soft_deleted_customers() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, company("Acme Ltd")).await.unwrap();
  h.engine.soft_delete(&actor, created.customer_id).await.unwrap();

  let anonymized = h.engine.anonymize(created.customer_id).await.unwrap();
  let Profile::Juristic(profile) = &anonymized.profile else {
    panic!("profile variant must be preserved");
  };
  assert!(profile.company_name.starts_with("Deleted_Company_"));
}

#[tokio::test]
async fn anonymize_missing_customer_is_not_found() {
  let h = harness();
  let result = h.engine.anonymize(Uuid::new_v4()).await;
  assert!(matches!(result, Err(Error::NotFound(_))));
}

// ─── Audit contract ──────────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_operations_audit_in_order() {
  let h = harness();
  let user = Uuid::new_v4();
  let actor = editor(user);

  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();
  let id = created.customer_id;
  h.engine.update(&actor, id, person("Johnny", "Doe", 0.0)).await.unwrap();
  h.engine.soft_delete(&actor, id).await.unwrap();
  h.engine.restore(&actor, id).await.unwrap();
  h.engine.anonymize(id).await.unwrap();

  let entries = h.drain().await;
  let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
  assert_eq!(actions, vec![
    AuditAction::Create,
    AuditAction::Update,
    AuditAction::Delete,
    AuditAction::Restore,
    AuditAction::Anonymize,
  ]);

  assert!(entries.iter().all(|e| e.entity == EntityKind::Customer));
  assert!(entries.iter().all(|e| e.entity_id == id));
  // Attributable operations carry the acting user; anonymization is SYSTEM.
  assert_eq!(entries[0].performed_by, Performer::User(user));
  assert_eq!(entries[2].performed_by, Performer::User(user));
  assert_eq!(entries[4].performed_by, Performer::System);
}

#[tokio::test]
async fn failed_operations_are_not_audited() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 5.0)).await.unwrap();

  let _ = h.engine.anonymize(created.customer_id).await;
  let _ = h.engine.soft_delete(&actor, Uuid::new_v4()).await;

  let entries = h.drain().await;
  let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
  assert_eq!(actions, vec![AuditAction::Create]);
}

#[tokio::test]
async fn sub_record_mutations_are_audited() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();

  let address = h
    .engine
    .add_address(&actor, NewAddress {
      customer_id:  created.customer_id,
      kind:         AddressKind::Mailing,
      line1:        "1 High St".to_owned(),
      line2:        None,
      city:         "Bangkok".to_owned(),
      district:     None,
      sub_district: None,
      region:       None,
      postal_code:  "10110".to_owned(),
      country:      "TH".to_owned(),
    })
    .await
    .unwrap();
  h.engine.remove_address(&actor, address.address_id).await.unwrap();

  let entries = h.drain().await;
  let address_entries: Vec<_> =
    entries.iter().filter(|e| e.entity == EntityKind::Address).collect();
  assert_eq!(address_entries.len(), 2);
  assert_eq!(address_entries[0].action, AuditAction::Create);
  assert_eq!(address_entries[1].action, AuditAction::Delete);
  assert!(address_entries.iter().all(|e| e.entity_id == address.address_id));
}

// ─── Sub-record validation ───────────────────────────────────────────────────

#[tokio::test]
async fn national_id_numbers_are_checksum_validated() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();

  let mut input = NewIdentityDocument {
    customer_id:     created.customer_id,
    kind:            IdentityKind::NationalId,
    number:          "1101100000002".to_owned(),
    issuing_country: Some("TH".to_owned()),
    expires_on:      None,
  };
  let result = h.engine.add_identity(&actor, input.clone()).await;
  assert!(matches!(result, Err(Error::Validation(ValidationError::Checksum))));

  input.number = "12345".to_owned();
  let result = h.engine.add_identity(&actor, input.clone()).await;
  assert!(matches!(result, Err(Error::Validation(ValidationError::Format))));

  // Passports are free-form; no checksum applies.
  input.kind = IdentityKind::Passport;
  input.number = "AB1234567".to_owned();
  assert!(h.engine.add_identity(&actor, input).await.is_ok());
}

#[tokio::test]
async fn duplicate_identity_numbers_are_rejected() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let first = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();
  let second = h.engine.create(&actor, person("Jane", "Roe", 0.0)).await.unwrap();

  h.engine
    .add_identity(&actor, NewIdentityDocument {
      customer_id:     first.customer_id,
      kind:            IdentityKind::NationalId,
      number:          VALID_CITIZEN_ID.to_owned(),
      issuing_country: None,
      expires_on:      None,
    })
    .await
    .unwrap();

  let result = h
    .engine
    .add_identity(&actor, NewIdentityDocument {
      customer_id:     second.customer_id,
      kind:            IdentityKind::NationalId,
      number:          VALID_CITIZEN_ID.to_owned(),
      issuing_country: None,
      expires_on:      None,
    })
    .await;
  assert!(matches!(result, Err(Error::Policy(PolicyError::DuplicateIdentity))));
}

#[tokio::test]
async fn self_referencing_relationship_is_rejected() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();

  let result = h
    .engine
    .add_relationship(&actor, NewRelationship {
      customer_id:         created.customer_id,
      related_customer_id: created.customer_id,
      role:                "director".to_owned(),
    })
    .await;
  assert!(matches!(result, Err(Error::Validation(ValidationError::Invalid(_)))));
}

#[tokio::test]
async fn consent_history_is_append_only() {
  let h = harness();
  let actor = editor(Uuid::new_v4());
  let created = h.engine.create(&actor, person("John", "Doe", 0.0)).await.unwrap();
  let id = created.customer_id;

  let grant = NewConsent {
    customer_id:    id,
    topic:          "marketing".to_owned(),
    policy_version: "2024-01".to_owned(),
    granted:        true,
  };
  h.engine.record_consent(&actor, grant.clone()).await.unwrap();
  h.engine
    .record_consent(&actor, NewConsent { granted: false, ..grant })
    .await
    .unwrap();

  let history = h.engine.list_consents(id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_ne!(history[0].granted, history[1].granted);
}

//! Collaborator traits the lifecycle engine calls into.
//!
//! Implemented by storage backends (e.g. `patron-store-sqlite`). The engine
//! depends on these abstractions, not on any concrete backend. All write
//! conditions (active-only, expected deleter, empty portfolio) are enforced
//! at the store so read-then-write sequences in the engine cannot lose a
//! race silently.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use uuid::Uuid;

use crate::{
  audit::{AuditEntry, AuditFilter, NewAuditEntry},
  customer::{Customer, Deletion, NewCustomer},
  record::{IdentityDocument, OwnedRecord},
  user::DirectoryUser,
};

// ─── Pagination ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Page {
  pub limit:  u32,
  pub offset: u32,
}

impl Default for Page {
  fn default() -> Self { Self { limit: 50, offset: 0 } }
}

// ─── Customer store ──────────────────────────────────────────────────────────

/// Persistence for the customer aggregate.
///
/// Reads through [`get`](Self::get), [`list`](Self::list) and
/// [`search`](Self::search) exclude soft-deleted rows; restoration and
/// anonymization go through [`get_any`](Self::get_any).
pub trait CustomerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new customer; the store assigns id and timestamps.
  fn create(
    &self,
    input: NewCustomer,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  /// Fetch an active customer. `None` if absent or soft-deleted.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// Fetch a customer regardless of deletion state.
  fn get_any(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// Replace the mutable fields of an active customer. `None` if there is no
  /// active row to update.
  fn update(
    &self,
    id: Uuid,
    input: NewCustomer,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// Mark an active customer deleted, recording the deleter. Conditional on
  /// the row still being active: a second call returns `None` and never
  /// overwrites the recorded deleter.
  fn soft_delete(
    &self,
    id: Uuid,
    by: Uuid,
  ) -> impl Future<Output = Result<Option<Deletion>, Self::Error>> + Send + '_;

  /// Clear the deletion mark, conditional on `deleted_by` still matching
  /// `expected_deleter` (compare-and-swap). `None` if no such row exists.
  fn restore(
    &self,
    id: Uuid,
    expected_deleter: Uuid,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// Overwrite the profile with its masked replacement, conditional on the
  /// portfolio still being empty at write time. `None` if the condition no
  /// longer holds (or the row is gone).
  fn apply_anonymization(
    &self,
    id: Uuid,
    masked: NewCustomer,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// Active customers, newest first.
  fn list(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Customer>, Self::Error>> + Send + '_;

  /// Soft-deleted customers, most recently deleted first.
  fn list_deleted(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Customer>, Self::Error>> + Send + '_;

  /// Case-insensitive substring match over person and company names,
  /// active customers only.
  fn search<'a>(
    &'a self,
    text: &'a str,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Customer>, Self::Error>> + Send + 'a;
}

// ─── Sub-record stores ───────────────────────────────────────────────────────

/// Persistence for one owned sub-record type. A backend implements this once
/// per record type it stores.
///
/// Deliberately append-and-read only: record types whose history may be
/// rewritten additionally implement [`MutableRecordStore`]. Consents do not —
/// their history is preserved at the type level.
pub trait RecordStore<R: OwnedRecord>: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new record; the store assigns id and timestamps.
  fn create(
    &self,
    input: R::New,
  ) -> impl Future<Output = Result<R, Self::Error>> + Send + '_;

  /// All records owned by the given customer.
  fn list_for(
    &self,
    customer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;
}

/// Deletion capability for sub-records that may be removed.
pub trait MutableRecordStore<R: OwnedRecord>: RecordStore<R> {
  /// Delete one record, returning it. `None` if absent.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<R>, Self::Error>> + Send + '_;

  /// Delete every record owned by the given customer, returning the count.
  /// Idempotent; used by the anonymization cascade.
  fn purge_for(
    &self,
    customer_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

/// Lookup of identity documents by their number, across all customers.
pub trait IdentityLookup: RecordStore<IdentityDocument> {
  fn get_by_number<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = Result<Option<IdentityDocument>, Self::Error>> + Send + 'a;
}

// ─── User directory ──────────────────────────────────────────────────────────

/// Read access to the external user directory; consulted only for the
/// supervisor check that guards restoration.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DirectoryUser>, Self::Error>> + Send + '_;
}

// ─── Audit sink ──────────────────────────────────────────────────────────────

/// Append-only audit log.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append exactly one entry; the sink assigns id and timestamp.
  fn append(
    &self,
    entry: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// Entries matching `filter`, newest first.
  fn list(
    &self,
    filter: AuditFilter,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}

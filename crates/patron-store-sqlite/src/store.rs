//! [`SqliteStore`] — the SQLite implementation of every collaborator trait.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use patron_core::{
  audit::{AuditEntry, AuditFilter, NewAuditEntry},
  customer::{Customer, Deletion, NewCustomer},
  record::{
    Address, Consent, IdentityDocument, NewAddress, NewConsent, NewIdentityDocument,
    NewRelationship, Relationship,
  },
  store::{
    AuditSink, CustomerStore, IdentityLookup, MutableRecordStore, Page, RecordStore,
    UserDirectory,
  },
  user::DirectoryUser,
};

use crate::{
  Error, Result,
  encode::{
    RawAddress, RawAuditEntry, RawConsent, RawCustomer, RawIdentity, RawRelationship,
    RawUser, encode_action, encode_address_kind, encode_customer_kind, encode_date,
    encode_dt, encode_entity, encode_identity_kind, encode_performer, encode_profile,
    encode_role, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

const CUSTOMER_COLUMNS: &str = "customer_id, profile_json, status, membership_tier, \
   points_balance, lifetime_value, portfolio_size, last_transaction_at, \
   preferred_channel, high_value, created_at, updated_at, deleted_at, deleted_by";

const ADDRESS_COLUMNS: &str = "address_id, customer_id, kind, line1, line2, city, \
   district, sub_district, region, postal_code, country, created_at, updated_at";

const IDENTITY_COLUMNS: &str = "identity_id, customer_id, kind, number, \
   issuing_country, expires_on, created_at, updated_at";

const RELATIONSHIP_COLUMNS: &str =
  "relationship_id, customer_id, related_customer_id, role, created_at";

const CONSENT_COLUMNS: &str =
  "consent_id, customer_id, topic, policy_version, granted, recorded_at";

const AUDIT_COLUMNS: &str =
  "entry_id, entity_id, entity_type, action, performed_by, note, origin, recorded_at";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn customer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCustomer> {
  Ok(RawCustomer {
    customer_id:         row.get(0)?,
    profile_json:        row.get(1)?,
    status:              row.get(2)?,
    membership_tier:     row.get(3)?,
    points_balance:      row.get(4)?,
    lifetime_value:      row.get(5)?,
    portfolio_size:      row.get(6)?,
    last_transaction_at: row.get(7)?,
    preferred_channel:   row.get(8)?,
    high_value:          row.get(9)?,
    created_at:          row.get(10)?,
    updated_at:          row.get(11)?,
    deleted_at:          row.get(12)?,
    deleted_by:          row.get(13)?,
  })
}

fn address_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAddress> {
  Ok(RawAddress {
    address_id:   row.get(0)?,
    customer_id:  row.get(1)?,
    kind:         row.get(2)?,
    line1:        row.get(3)?,
    line2:        row.get(4)?,
    city:         row.get(5)?,
    district:     row.get(6)?,
    sub_district: row.get(7)?,
    region:       row.get(8)?,
    postal_code:  row.get(9)?,
    country:      row.get(10)?,
    created_at:   row.get(11)?,
    updated_at:   row.get(12)?,
  })
}

fn identity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawIdentity> {
  Ok(RawIdentity {
    identity_id:     row.get(0)?,
    customer_id:     row.get(1)?,
    kind:            row.get(2)?,
    number:          row.get(3)?,
    issuing_country: row.get(4)?,
    expires_on:      row.get(5)?,
    created_at:      row.get(6)?,
    updated_at:      row.get(7)?,
  })
}

fn relationship_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRelationship> {
  Ok(RawRelationship {
    relationship_id:     row.get(0)?,
    customer_id:         row.get(1)?,
    related_customer_id: row.get(2)?,
    role:                row.get(3)?,
    created_at:          row.get(4)?,
  })
}

fn consent_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConsent> {
  Ok(RawConsent {
    consent_id:     row.get(0)?,
    customer_id:    row.get(1)?,
    topic:          row.get(2)?,
    policy_version: row.get(3)?,
    granted:        row.get(4)?,
    recorded_at:    row.get(5)?,
  })
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:       row.get(0)?,
    role:          row.get(1)?,
    supervisor_id: row.get(2)?,
  })
}

fn audit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAuditEntry> {
  Ok(RawAuditEntry {
    entry_id:     row.get(0)?,
    entity_id:    row.get(1)?,
    entity_type:  row.get(2)?,
    action:       row.get(3)?,
    performed_by: row.get(4)?,
    note:         row.get(5)?,
    origin:       row.get(6)?,
    recorded_at:  row.get(7)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Patron store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_customer(&self, id: Uuid, include_deleted: bool) -> Result<Option<Customer>> {
    let id_str = encode_uuid(id);
    let guard = if include_deleted { "" } else { " AND deleted_at IS NULL" };
    let sql =
      format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_id = ?1{guard}");

    let raw: Option<RawCustomer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], customer_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCustomer::into_customer).transpose()
  }

  async fn list_customers(&self, sql: String, page: Page) -> Result<Vec<Customer>> {
    let raws: Vec<RawCustomer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![page.limit, page.offset], customer_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCustomer::into_customer).collect()
  }

  /// Insert a fully-built [`Customer`] into the `customers` table.
  async fn insert_customer(&self, customer: &Customer) -> Result<()> {
    let id_str        = encode_uuid(customer.customer_id);
    let kind_str      = encode_customer_kind(customer.kind()).to_owned();
    let profile_json  = encode_profile(&customer.profile)?;
    let display_name  = customer.profile.display_name();
    let status_str    = encode_status(customer.business.status).to_owned();
    let tier          = customer.business.membership_tier.clone();
    let last_tx_str   = customer.business.last_transaction_at.map(encode_dt);
    let channel       = customer.business.preferred_channel.clone();
    let created_str   = encode_dt(customer.created_at);
    let updated_str   = encode_dt(customer.updated_at);
    let points        = customer.business.points_balance;
    let lifetime      = customer.business.lifetime_value;
    let portfolio     = customer.business.portfolio_size;
    let high_value    = customer.business.high_value;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO customers (
             customer_id, kind, profile_json, display_name, status,
             membership_tier, points_balance, lifetime_value, portfolio_size,
             last_transaction_at, preferred_channel, high_value,
             created_at, updated_at, deleted_at, deleted_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL, NULL)",
          rusqlite::params![
            id_str,
            kind_str,
            profile_json,
            display_name,
            status_str,
            tier,
            points,
            lifetime,
            portfolio,
            last_tx_str,
            channel,
            high_value,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Overwrite the mutable columns of one customer row, guarded by an extra
  /// WHERE conjunct. Returns whether a row matched.
  async fn overwrite_customer(
    &self,
    id: Uuid,
    input: NewCustomer,
    guard: &'static str,
  ) -> Result<bool> {
    let id_str       = encode_uuid(id);
    let kind_str     = encode_customer_kind(input.profile.kind()).to_owned();
    let profile_json = encode_profile(&input.profile)?;
    let display_name = input.profile.display_name();
    let status_str   = encode_status(input.business.status).to_owned();
    let tier         = input.business.membership_tier;
    let last_tx_str  = input.business.last_transaction_at.map(encode_dt);
    let channel      = input.business.preferred_channel;
    let updated_str  = encode_dt(Utc::now());
    let points       = input.business.points_balance;
    let lifetime     = input.business.lifetime_value;
    let portfolio    = input.business.portfolio_size;
    let high_value   = input.business.high_value;

    let sql = format!(
      "UPDATE customers SET
         kind = ?2, profile_json = ?3, display_name = ?4, status = ?5,
         membership_tier = ?6, points_balance = ?7, lifetime_value = ?8,
         portfolio_size = ?9, last_transaction_at = ?10, preferred_channel = ?11,
         high_value = ?12, updated_at = ?13
       WHERE customer_id = ?1 AND {guard}"
    );

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &sql,
          rusqlite::params![
            id_str,
            kind_str,
            profile_json,
            display_name,
            status_str,
            tier,
            points,
            lifetime,
            portfolio,
            last_tx_str,
            channel,
            high_value,
            updated_str,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  /// Create or replace a user directory entry.
  ///
  /// User provisioning belongs to the identity system outside this service;
  /// this is the seam through which it (and the test suite) populates the
  /// directory.
  pub async fn put_user(&self, user: DirectoryUser) -> Result<()> {
    let id_str         = encode_uuid(user.user_id);
    let role_str       = encode_role(user.role).to_owned();
    let supervisor_str = user.supervisor_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, role, supervisor_id) VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET
             role = excluded.role, supervisor_id = excluded.supervisor_id",
          rusqlite::params![id_str, role_str, supervisor_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CustomerStore impl ──────────────────────────────────────────────────────

impl CustomerStore for SqliteStore {
  type Error = Error;

  async fn create(&self, input: NewCustomer) -> Result<Customer> {
    let now = Utc::now();
    let customer = Customer {
      customer_id: Uuid::new_v4(),
      profile:     input.profile,
      business:    input.business,
      created_at:  now,
      updated_at:  now,
      deleted:     None,
    };
    self.insert_customer(&customer).await?;
    Ok(customer)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Customer>> {
    self.fetch_customer(id, false).await
  }

  async fn get_any(&self, id: Uuid) -> Result<Option<Customer>> {
    self.fetch_customer(id, true).await
  }

  async fn update(&self, id: Uuid, input: NewCustomer) -> Result<Option<Customer>> {
    if !self.overwrite_customer(id, input, "deleted_at IS NULL").await? {
      return Ok(None);
    }
    self.fetch_customer(id, false).await
  }

  async fn soft_delete(&self, id: Uuid, by: Uuid) -> Result<Option<Deletion>> {
    let deletion = Deletion { at: Utc::now(), by: Some(by) };
    let id_str = encode_uuid(id);
    let at_str = encode_dt(deletion.at);
    let by_str = encode_uuid(by);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE customers SET deleted_at = ?2, deleted_by = ?3
           WHERE customer_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, at_str, by_str],
        )?)
      })
      .await?;

    Ok((changed > 0).then_some(deletion))
  }

  async fn restore(&self, id: Uuid, expected_deleter: Uuid) -> Result<Option<Customer>> {
    let id_str      = encode_uuid(id);
    let deleter_str = encode_uuid(expected_deleter);
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE customers SET deleted_at = NULL, deleted_by = NULL, updated_at = ?3
           WHERE customer_id = ?1 AND deleted_by = ?2 AND deleted_at IS NOT NULL",
          rusqlite::params![id_str, deleter_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_customer(id, false).await
  }

  async fn apply_anonymization(
    &self,
    id: Uuid,
    masked: NewCustomer,
  ) -> Result<Option<Customer>> {
    // The portfolio gate is re-checked at write time; soft-deleted rows are
    // still eligible for erasure.
    if !self.overwrite_customer(id, masked, "portfolio_size = 0").await? {
      return Ok(None);
    }
    self.fetch_customer(id, true).await
  }

  async fn list(&self, page: Page) -> Result<Vec<Customer>> {
    let sql = format!(
      "SELECT {CUSTOMER_COLUMNS} FROM customers
       WHERE deleted_at IS NULL
       ORDER BY created_at DESC, rowid DESC
       LIMIT ?1 OFFSET ?2"
    );
    self.list_customers(sql, page).await
  }

  async fn list_deleted(&self, page: Page) -> Result<Vec<Customer>> {
    let sql = format!(
      "SELECT {CUSTOMER_COLUMNS} FROM customers
       WHERE deleted_at IS NOT NULL
       ORDER BY deleted_at DESC, rowid DESC
       LIMIT ?1 OFFSET ?2"
    );
    self.list_customers(sql, page).await
  }

  async fn search(&self, text: &str, page: Page) -> Result<Vec<Customer>> {
    let pattern = format!("%{}%", text.to_lowercase());
    let sql = format!(
      "SELECT {CUSTOMER_COLUMNS} FROM customers
       WHERE deleted_at IS NULL AND LOWER(display_name) LIKE ?1
       ORDER BY created_at DESC, rowid DESC
       LIMIT ?2 OFFSET ?3"
    );

    let raws: Vec<RawCustomer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, page.limit, page.offset], customer_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCustomer::into_customer).collect()
  }
}

// ─── Sub-record store impls ──────────────────────────────────────────────────

impl RecordStore<Address> for SqliteStore {
  type Error = Error;

  async fn create(&self, input: NewAddress) -> Result<Address> {
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

    let id_str       = encode_uuid(address.address_id);
    let customer_str = encode_uuid(address.customer_id);
    let kind_str     = encode_address_kind(&address.kind)?;
    let at_str       = encode_dt(now);
    let row          = address.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO addresses (
             address_id, customer_id, kind, line1, line2, city, district,
             sub_district, region, postal_code, country, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            id_str,
            customer_str,
            kind_str,
            row.line1,
            row.line2,
            row.city,
            row.district,
            row.sub_district,
            row.region,
            row.postal_code,
            row.country,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(address)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Address>> {
    let customer_str = encode_uuid(customer_id);
    let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE customer_id = ?1");

    let raws: Vec<RawAddress> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![customer_str], address_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAddress::into_address).collect()
  }
}

impl MutableRecordStore<Address> for SqliteStore {
  async fn delete(&self, id: Uuid) -> Result<Option<Address>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE address_id = ?1");

    let raw: Option<RawAddress> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&sql, rusqlite::params![id_str], address_row)
          .optional()?;
        if raw.is_some() {
          conn.execute(
            "DELETE FROM addresses WHERE address_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        Ok(raw)
      })
      .await?;

    raw.map(RawAddress::into_address).transpose()
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64> {
    let customer_str = encode_uuid(customer_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM addresses WHERE customer_id = ?1",
          rusqlite::params![customer_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }
}

impl RecordStore<IdentityDocument> for SqliteStore {
  type Error = Error;

  async fn create(&self, input: NewIdentityDocument) -> Result<IdentityDocument> {
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

    let id_str       = encode_uuid(identity.identity_id);
    let customer_str = encode_uuid(identity.customer_id);
    let kind_str     = encode_identity_kind(&identity.kind)?;
    let expires_str  = identity.expires_on.map(encode_date);
    let at_str       = encode_dt(now);
    let number       = identity.number.clone();
    let country      = identity.issuing_country.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (
             identity_id, customer_id, kind, number, issuing_country,
             expires_on, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            customer_str,
            kind_str,
            number,
            country,
            expires_str,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(identity)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<IdentityDocument>> {
    let customer_str = encode_uuid(customer_id);
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE customer_id = ?1");

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![customer_str], identity_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }
}

impl MutableRecordStore<IdentityDocument> for SqliteStore {
  async fn delete(&self, id: Uuid) -> Result<Option<IdentityDocument>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE identity_id = ?1");

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&sql, rusqlite::params![id_str], identity_row)
          .optional()?;
        if raw.is_some() {
          conn.execute(
            "DELETE FROM identities WHERE identity_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        Ok(raw)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64> {
    let customer_str = encode_uuid(customer_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM identities WHERE customer_id = ?1",
          rusqlite::params![customer_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }
}

impl IdentityLookup for SqliteStore {
  async fn get_by_number(&self, number: &str) -> Result<Option<IdentityDocument>> {
    let number = number.to_owned();
    let sql =
      format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE number = ?1 LIMIT 1");

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![number], identity_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }
}

impl RecordStore<Relationship> for SqliteStore {
  type Error = Error;

  async fn create(&self, input: NewRelationship) -> Result<Relationship> {
    let relationship = Relationship {
      relationship_id:     Uuid::new_v4(),
      customer_id:         input.customer_id,
      related_customer_id: input.related_customer_id,
      role:                input.role,
      created_at:          Utc::now(),
    };

    let id_str       = encode_uuid(relationship.relationship_id);
    let customer_str = encode_uuid(relationship.customer_id);
    let related_str  = encode_uuid(relationship.related_customer_id);
    let at_str       = encode_dt(relationship.created_at);
    let role         = relationship.role.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO relationships (
             relationship_id, customer_id, related_customer_id, role, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, customer_str, related_str, role, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(relationship)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Relationship>> {
    let customer_str = encode_uuid(customer_id);
    let sql =
      format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE customer_id = ?1");

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![customer_str], relationship_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRelationship::into_relationship)
      .collect()
  }
}

impl MutableRecordStore<Relationship> for SqliteStore {
  async fn delete(&self, id: Uuid) -> Result<Option<Relationship>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE relationship_id = ?1"
    );

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&sql, rusqlite::params![id_str], relationship_row)
          .optional()?;
        if raw.is_some() {
          conn.execute(
            "DELETE FROM relationships WHERE relationship_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        Ok(raw)
      })
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn purge_for(&self, customer_id: Uuid) -> Result<u64> {
    let customer_str = encode_uuid(customer_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM relationships WHERE customer_id = ?1",
          rusqlite::params![customer_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }
}

impl RecordStore<Consent> for SqliteStore {
  type Error = Error;

  async fn create(&self, input: NewConsent) -> Result<Consent> {
    let consent = Consent {
      consent_id:     Uuid::new_v4(),
      customer_id:    input.customer_id,
      topic:          input.topic,
      policy_version: input.policy_version,
      granted:        input.granted,
      recorded_at:    Utc::now(),
    };

    let id_str       = encode_uuid(consent.consent_id);
    let customer_str = encode_uuid(consent.customer_id);
    let at_str       = encode_dt(consent.recorded_at);
    let topic        = consent.topic.clone();
    let version      = consent.policy_version.clone();
    let granted      = consent.granted;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO consents (
             consent_id, customer_id, topic, policy_version, granted, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, customer_str, topic, version, granted, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(consent)
  }

  async fn list_for(&self, customer_id: Uuid) -> Result<Vec<Consent>> {
    let customer_str = encode_uuid(customer_id);
    let sql = format!(
      "SELECT {CONSENT_COLUMNS} FROM consents
       WHERE customer_id = ?1
       ORDER BY recorded_at DESC, rowid DESC"
    );

    let raws: Vec<RawConsent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![customer_str], consent_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConsent::into_consent).collect()
  }
}

// ─── User directory impl ─────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryUser>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, role, supervisor_id FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              user_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── Audit sink impl ─────────────────────────────────────────────────────────

impl AuditSink for SqliteStore {
  type Error = Error;

  async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
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

    let id_str        = encode_uuid(entry.entry_id);
    let entity_id_str = encode_uuid(entry.entity_id);
    let entity_str    = encode_entity(entry.entity).to_owned();
    let action_str    = encode_action(entry.action).to_owned();
    let performer_str = encode_performer(entry.performed_by);
    let at_str        = encode_dt(entry.recorded_at);
    let note          = entry.note.clone();
    let origin        = entry.origin.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (
             entry_id, entity_id, entity_type, action, performed_by,
             note, origin, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            entity_id_str,
            entity_str,
            action_str,
            performer_str,
            note,
            origin,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(entry)
  }

  async fn list(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
    let entity_id_str = filter.entity_id.map(encode_uuid);
    let action_str    = filter.action.map(encode_action).map(str::to_owned);
    let page          = filter.page;

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<&'static str> = vec![];
        if entity_id_str.is_some() {
          conds.push("entity_id = ?1");
        }
        if action_str.is_some() {
          conds.push("action = ?2");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_log
           {where_clause}
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              entity_id_str.as_deref(),
              action_str.as_deref(),
              page.limit,
              page.offset,
            ],
            audit_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }
}

//! SQL schema for the Patron SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS customers (
    customer_id         TEXT PRIMARY KEY,
    kind                TEXT NOT NULL,   -- 'PERSONAL' | 'JURISTIC'
    profile_json        TEXT NOT NULL,   -- tagged Profile payload
    display_name        TEXT NOT NULL,   -- derived from the profile; drives search
    status              TEXT NOT NULL,
    membership_tier     TEXT NOT NULL DEFAULT '',
    points_balance      REAL NOT NULL DEFAULT 0,
    lifetime_value      REAL NOT NULL DEFAULT 0,
    portfolio_size      REAL NOT NULL DEFAULT 0,
    last_transaction_at TEXT,
    preferred_channel   TEXT,
    high_value          INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    deleted_at          TEXT,            -- NULL means active
    deleted_by          TEXT
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id   TEXT PRIMARY KEY,
    customer_id  TEXT NOT NULL REFERENCES customers(customer_id),
    kind         TEXT NOT NULL,
    line1        TEXT NOT NULL,
    line2        TEXT,
    city         TEXT NOT NULL,
    district     TEXT,
    sub_district TEXT,
    region       TEXT,
    postal_code  TEXT NOT NULL,
    country      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS identities (
    identity_id     TEXT PRIMARY KEY,
    customer_id     TEXT NOT NULL REFERENCES customers(customer_id),
    kind            TEXT NOT NULL,
    number          TEXT NOT NULL,
    issuing_country TEXT,
    expires_on      TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    relationship_id     TEXT PRIMARY KEY,
    customer_id         TEXT NOT NULL REFERENCES customers(customer_id),
    related_customer_id TEXT NOT NULL REFERENCES customers(customer_id),
    role                TEXT NOT NULL,
    created_at          TEXT NOT NULL
);

-- Consents are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS consents (
    consent_id     TEXT PRIMARY KEY,
    customer_id    TEXT NOT NULL REFERENCES customers(customer_id),
    topic          TEXT NOT NULL,
    policy_version TEXT NOT NULL,
    granted        INTEGER NOT NULL,
    recorded_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    role          TEXT NOT NULL,
    supervisor_id TEXT
);

-- The audit log is strictly append-only.
CREATE TABLE IF NOT EXISTS audit_log (
    entry_id     TEXT PRIMARY KEY,
    entity_id    TEXT NOT NULL,
    entity_type  TEXT NOT NULL,
    action       TEXT NOT NULL,
    performed_by TEXT NOT NULL,
    note         TEXT NOT NULL,
    origin       TEXT,
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS customers_display_idx   ON customers(display_name);
CREATE INDEX IF NOT EXISTS customers_deleted_idx   ON customers(deleted_at);
CREATE INDEX IF NOT EXISTS addresses_customer_idx  ON addresses(customer_id);
CREATE INDEX IF NOT EXISTS identities_customer_idx ON identities(customer_id);
CREATE INDEX IF NOT EXISTS identities_number_idx   ON identities(number);
CREATE INDEX IF NOT EXISTS relationships_customer_idx ON relationships(customer_id);
CREATE INDEX IF NOT EXISTS consents_customer_idx   ON consents(customer_id);
CREATE INDEX IF NOT EXISTS audit_entity_idx        ON audit_log(entity_id);

PRAGMA user_version = 1;
";

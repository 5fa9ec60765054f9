//! patron — operator CLI for the customer registry.
//!
//! Reads `patron.toml` (or the path given with `--config`), opens the SQLite
//! store, spawns the audit writer and dispatches one subcommand per engine
//! operation. The caller identity the excluded auth layer would normally
//! resolve is supplied explicitly with `--user`/`--role`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use patron_core::{
  audit::{AuditAction, AuditFilter},
  customer::{
    BusinessProfile, CompanyProfile, CustomerStatus, NewCustomer, PersonProfile, Profile,
  },
  record::{
    AddressKind, IdentityKind, NewAddress, NewConsent, NewIdentityDocument,
    NewRelationship,
  },
  store::{AuditSink, Page, UserDirectory},
  user::{Actor, DirectoryUser, Role},
};
use patron_engine::{AuditRecorder, Engine};
use patron_store_sqlite::SqliteStore;
use serde::Serialize;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod settings;

use settings::Settings;

// ─── Command line ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Patron customer registry CLI")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "patron.toml")]
  config: PathBuf,

  /// Acting user id; required for state-changing commands.
  #[arg(long)]
  user: Option<Uuid>,

  /// Role of the acting user.
  #[arg(long, value_enum, default_value = "admin")]
  role: RoleArg,

  /// Network origin recorded into audit entries.
  #[arg(long)]
  origin: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Customer lifecycle operations.
  #[command(subcommand)]
  Customer(CustomerCommand),

  /// Postal addresses of a customer.
  #[command(subcommand)]
  Address(AddressCommand),

  /// Identity documents of a customer.
  #[command(subcommand)]
  Identity(IdentityCommand),

  /// Links between customers.
  #[command(subcommand)]
  Relationship(RelationshipCommand),

  /// Consent history of a customer.
  #[command(subcommand)]
  Consent(ConsentCommand),

  /// Inspect the audit trail.
  Audit {
    /// Restrict to one entity id.
    #[arg(long)]
    entity: Option<Uuid>,

    /// Restrict to one action.
    #[arg(long, value_enum)]
    action: Option<ActionArg>,

    #[command(flatten)]
    page: PageArgs,
  },

  /// User directory entries (normally provisioned by the identity system).
  #[command(subcommand)]
  User(UserCommand),
}

#[derive(Subcommand)]
enum CustomerCommand {
  /// Create a personal customer.
  CreatePerson {
    #[command(flatten)]
    person:   PersonArgs,
    #[command(flatten)]
    business: BusinessArgs,
  },

  /// Create a juristic customer.
  CreateCompany {
    #[command(flatten)]
    company:  CompanyArgs,
    #[command(flatten)]
    business: BusinessArgs,
  },

  /// Fetch one active customer.
  Get { id: Uuid },

  /// Replace the profile of a personal customer.
  UpdatePerson {
    id: Uuid,
    #[command(flatten)]
    person:   PersonArgs,
    #[command(flatten)]
    business: BusinessArgs,
  },

  /// Replace the profile of a juristic customer.
  UpdateCompany {
    id: Uuid,
    #[command(flatten)]
    company:  CompanyArgs,
    #[command(flatten)]
    business: BusinessArgs,
  },

  /// Soft-delete a customer.
  Delete { id: Uuid },

  /// Restore a soft-deleted customer (deleter or their supervisor only).
  Restore { id: Uuid },

  /// Irreversibly anonymize a customer with an empty portfolio.
  Anonymize { id: Uuid },

  /// List customers, newest first.
  List {
    /// List soft-deleted customers instead of active ones.
    #[arg(long)]
    deleted: bool,

    #[command(flatten)]
    page: PageArgs,
  },

  /// Case-insensitive name search.
  Search {
    text: String,
    #[command(flatten)]
    page: PageArgs,
  },
}

#[derive(Subcommand)]
enum AddressCommand {
  Add {
    customer_id: Uuid,
    #[arg(long, value_enum, default_value = "registered")]
    kind:         AddressKindArg,
    #[arg(long)]
    line1:        String,
    #[arg(long)]
    line2:        Option<String>,
    #[arg(long)]
    city:         String,
    #[arg(long)]
    district:     Option<String>,
    #[arg(long)]
    sub_district: Option<String>,
    #[arg(long)]
    region:       Option<String>,
    #[arg(long)]
    postal_code:  String,
    #[arg(long)]
    country:      String,
  },
  List { customer_id: Uuid },
  Remove { id: Uuid },
}

#[derive(Subcommand)]
enum IdentityCommand {
  Add {
    customer_id: Uuid,
    #[arg(long, value_enum)]
    kind:    IdentityKindArg,
    #[arg(long)]
    number:  String,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    expires: Option<NaiveDate>,
  },
  List { customer_id: Uuid },
  Remove { id: Uuid },
}

#[derive(Subcommand)]
enum RelationshipCommand {
  Add {
    customer_id: Uuid,
    related_id:  Uuid,
    /// Relation label, e.g. "director" or "guarantor".
    #[arg(long)]
    relation: String,
  },
  List { customer_id: Uuid },
  Remove { id: Uuid },
}

#[derive(Subcommand)]
enum ConsentCommand {
  /// Record a consent grant (or, with --revoked, a revocation).
  Record {
    customer_id: Uuid,
    #[arg(long)]
    topic: String,
    #[arg(long)]
    policy_version: String,
    #[arg(long)]
    revoked: bool,
  },
  List { customer_id: Uuid },
}

#[derive(Subcommand)]
enum UserCommand {
  /// Create or replace a directory entry.
  Put {
    id: Uuid,
    #[arg(long, value_enum, default_value = "editor")]
    user_role: RoleArg,
    #[arg(long)]
    supervisor: Option<Uuid>,
  },
  Get { id: Uuid },
}

// ─── Shared argument groups ──────────────────────────────────────────────────

#[derive(Args)]
struct PersonArgs {
  #[arg(long)]
  first_name:  String,
  #[arg(long)]
  last_name:   String,
  #[arg(long)]
  title:       Option<String>,
  #[arg(long)]
  born:        Option<NaiveDate>,
  #[arg(long)]
  nationality: Option<String>,
}

#[derive(Args)]
struct CompanyArgs {
  #[arg(long)]
  name:       String,
  #[arg(long)]
  registered: Option<NaiveDate>,
  #[arg(long)]
  industry:   Option<String>,
}

#[derive(Args)]
struct BusinessArgs {
  #[arg(long, value_enum, default_value = "active")]
  status:         StatusArg,
  #[arg(long, default_value = "standard")]
  tier:           String,
  #[arg(long, default_value_t = 0.0)]
  points:         f64,
  #[arg(long, default_value_t = 0.0)]
  lifetime_value: f64,
  #[arg(long, default_value_t = 0.0)]
  portfolio:      f64,
  #[arg(long)]
  channel:        Option<String>,
  #[arg(long)]
  high_value:     bool,
}

#[derive(Args)]
struct PageArgs {
  #[arg(long, default_value_t = 50)]
  limit:  u32,
  #[arg(long, default_value_t = 0)]
  offset: u32,
}

impl From<PageArgs> for Page {
  fn from(p: PageArgs) -> Self {
    Self { limit: p.limit, offset: p.offset }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
  Admin,
  Editor,
  Viewer,
}

impl From<RoleArg> for Role {
  fn from(r: RoleArg) -> Self {
    match r {
      RoleArg::Admin => Role::Admin,
      RoleArg::Editor => Role::Editor,
      RoleArg::Viewer => Role::Viewer,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
  Active,
  Inactive,
  Suspended,
  Deceased,
  Blacklisted,
}

impl From<StatusArg> for CustomerStatus {
  fn from(s: StatusArg) -> Self {
    match s {
      StatusArg::Active => CustomerStatus::Active,
      StatusArg::Inactive => CustomerStatus::Inactive,
      StatusArg::Suspended => CustomerStatus::Suspended,
      StatusArg::Deceased => CustomerStatus::Deceased,
      StatusArg::Blacklisted => CustomerStatus::Blacklisted,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum AddressKindArg {
  Registered,
  Mailing,
  Headquarters,
}

impl From<AddressKindArg> for AddressKind {
  fn from(k: AddressKindArg) -> Self {
    match k {
      AddressKindArg::Registered => AddressKind::Registered,
      AddressKindArg::Mailing => AddressKind::Mailing,
      AddressKindArg::Headquarters => AddressKind::Headquarters,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum IdentityKindArg {
  NationalId,
  Passport,
  TaxId,
}

impl From<IdentityKindArg> for IdentityKind {
  fn from(k: IdentityKindArg) -> Self {
    match k {
      IdentityKindArg::NationalId => IdentityKind::NationalId,
      IdentityKindArg::Passport => IdentityKind::Passport,
      IdentityKindArg::TaxId => IdentityKind::TaxId,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
  Create,
  Update,
  Delete,
  Restore,
  Anonymize,
}

impl From<ActionArg> for AuditAction {
  fn from(a: ActionArg) -> Self {
    match a {
      ActionArg::Create => AuditAction::Create,
      ActionArg::Update => AuditAction::Update,
      ActionArg::Delete => AuditAction::Delete,
      ActionArg::Restore => AuditAction::Restore,
      ActionArg::Anonymize => AuditAction::Anonymize,
    }
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("PATRON"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")?;

  let store = Arc::new(
    SqliteStore::open(&settings.store_path)
      .await
      .with_context(|| format!("failed to open store at {:?}", settings.store_path))?,
  );

  let (recorder, worker) = AuditRecorder::spawn(store.clone(), settings.audit_queue_depth);
  let engine = Engine::new(store.clone(), store.clone(), recorder);

  let actor = cli
    .user
    .map(|user_id| match &cli.origin {
      Some(origin) => Actor::with_origin(user_id, cli.role.into(), origin.clone()),
      None => Actor::new(user_id, cli.role.into()),
    });

  run(cli.command, &engine, &store, actor).await?;

  // Flush queued audit entries before exiting.
  drop(engine);
  worker.await.context("audit worker")?;
  Ok(())
}

fn require_actor(actor: Option<Actor>) -> anyhow::Result<Actor> {
  actor.context("this command changes state; pass --user <uuid>")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn run(
  command: Command,
  engine: &Engine<SqliteStore, SqliteStore>,
  store: &Arc<SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    Command::Customer(command) => run_customer(command, engine, actor).await,
    Command::Address(command) => run_address(command, engine, actor).await,
    Command::Identity(command) => run_identity(command, engine, actor).await,
    Command::Relationship(command) => run_relationship(command, engine, actor).await,
    Command::Consent(command) => run_consent(command, engine, actor).await,
    Command::Audit { entity, action, page } => {
      let entries = AuditSink::list(store.as_ref(), AuditFilter {
        entity_id: entity,
        action:    action.map(Into::into),
        page:      page.into(),
      })
      .await?;
      print_json(&entries)
    },
    Command::User(command) => match command {
      UserCommand::Put { id, user_role, supervisor } => {
        let user = DirectoryUser {
          user_id:       id,
          role:          user_role.into(),
          supervisor_id: supervisor,
        };
        store.put_user(user).await?;
        print_json(&user)
      },
      UserCommand::Get { id } => {
        let user = store.get_user(id).await?.context("no such directory entry")?;
        print_json(&user)
      },
    },
  }
}

fn person_input(person: PersonArgs, business: BusinessArgs) -> NewCustomer {
  NewCustomer {
    profile:  Profile::Personal(PersonProfile {
      first_name:    person.first_name,
      last_name:     person.last_name,
      title:         person.title,
      date_of_birth: person.born,
      nationality:   person.nationality,
    }),
    business: business_input(business),
  }
}

fn company_input(company: CompanyArgs, business: BusinessArgs) -> NewCustomer {
  NewCustomer {
    profile:  Profile::Juristic(CompanyProfile {
      company_name:      company.name,
      registration_date: company.registered,
      industry_code:     company.industry,
    }),
    business: business_input(business),
  }
}

fn business_input(business: BusinessArgs) -> BusinessProfile {
  BusinessProfile {
    status:              business.status.into(),
    membership_tier:     business.tier,
    points_balance:      business.points,
    lifetime_value:      business.lifetime_value,
    portfolio_size:      business.portfolio,
    last_transaction_at: None,
    preferred_channel:   business.channel,
    high_value:          business.high_value,
  }
}

async fn run_customer(
  command: CustomerCommand,
  engine: &Engine<SqliteStore, SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    CustomerCommand::CreatePerson { person, business } => {
      let actor = require_actor(actor)?;
      let customer = engine.create(&actor, person_input(person, business)).await?;
      print_json(&customer)
    },
    CustomerCommand::CreateCompany { company, business } => {
      let actor = require_actor(actor)?;
      let customer = engine.create(&actor, company_input(company, business)).await?;
      print_json(&customer)
    },
    CustomerCommand::Get { id } => print_json(&engine.get(id).await?),
    CustomerCommand::UpdatePerson { id, person, business } => {
      let actor = require_actor(actor)?;
      let customer = engine.update(&actor, id, person_input(person, business)).await?;
      print_json(&customer)
    },
    CustomerCommand::UpdateCompany { id, company, business } => {
      let actor = require_actor(actor)?;
      let customer = engine.update(&actor, id, company_input(company, business)).await?;
      print_json(&customer)
    },
    CustomerCommand::Delete { id } => {
      let actor = require_actor(actor)?;
      engine.soft_delete(&actor, id).await?;
      print_json(&json!({ "deleted": id }))
    },
    CustomerCommand::Restore { id } => {
      let actor = require_actor(actor)?;
      print_json(&engine.restore(&actor, id).await?)
    },
    CustomerCommand::Anonymize { id } => {
      require_actor(actor)?;
      print_json(&engine.anonymize(id).await?)
    },
    CustomerCommand::List { deleted, page } => {
      let customers = if deleted {
        engine.list_deleted(page.into()).await?
      } else {
        engine.list(page.into()).await?
      };
      print_json(&customers)
    },
    CustomerCommand::Search { text, page } => {
      print_json(&engine.search(&text, page.into()).await?)
    },
  }
}

async fn run_address(
  command: AddressCommand,
  engine: &Engine<SqliteStore, SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    AddressCommand::Add {
      customer_id,
      kind,
      line1,
      line2,
      city,
      district,
      sub_district,
      region,
      postal_code,
      country,
    } => {
      let actor = require_actor(actor)?;
      let address = engine
        .add_address(&actor, NewAddress {
          customer_id,
          kind: kind.into(),
          line1,
          line2,
          city,
          district,
          sub_district,
          region,
          postal_code,
          country,
        })
        .await?;
      print_json(&address)
    },
    AddressCommand::List { customer_id } => {
      print_json(&engine.list_addresses(customer_id).await?)
    },
    AddressCommand::Remove { id } => {
      let actor = require_actor(actor)?;
      engine.remove_address(&actor, id).await?;
      print_json(&json!({ "removed": id }))
    },
  }
}

async fn run_identity(
  command: IdentityCommand,
  engine: &Engine<SqliteStore, SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    IdentityCommand::Add { customer_id, kind, number, country, expires } => {
      let actor = require_actor(actor)?;
      let identity = engine
        .add_identity(&actor, NewIdentityDocument {
          customer_id,
          kind: kind.into(),
          number,
          issuing_country: country,
          expires_on: expires,
        })
        .await?;
      print_json(&identity)
    },
    IdentityCommand::List { customer_id } => {
      print_json(&engine.list_identities(customer_id).await?)
    },
    IdentityCommand::Remove { id } => {
      let actor = require_actor(actor)?;
      engine.remove_identity(&actor, id).await?;
      print_json(&json!({ "removed": id }))
    },
  }
}

async fn run_relationship(
  command: RelationshipCommand,
  engine: &Engine<SqliteStore, SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    RelationshipCommand::Add { customer_id, related_id, relation } => {
      let actor = require_actor(actor)?;
      let relationship = engine
        .add_relationship(&actor, NewRelationship {
          customer_id,
          related_customer_id: related_id,
          role: relation,
        })
        .await?;
      print_json(&relationship)
    },
    RelationshipCommand::List { customer_id } => {
      print_json(&engine.list_relationships(customer_id).await?)
    },
    RelationshipCommand::Remove { id } => {
      let actor = require_actor(actor)?;
      engine.remove_relationship(&actor, id).await?;
      print_json(&json!({ "removed": id }))
    },
  }
}

async fn run_consent(
  command: ConsentCommand,
  engine: &Engine<SqliteStore, SqliteStore>,
  actor: Option<Actor>,
) -> anyhow::Result<()> {
  match command {
    ConsentCommand::Record { customer_id, topic, policy_version, revoked } => {
      let actor = require_actor(actor)?;
      let consent = engine
        .record_consent(&actor, NewConsent {
          customer_id,
          topic,
          policy_version,
          granted: !revoked,
        })
        .await?;
      print_json(&consent)
    },
    ConsentCommand::List { customer_id } => {
      print_json(&engine.list_consents(customer_id).await?)
    },
  }
}

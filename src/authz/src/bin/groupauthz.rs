//! Group authorization CLI
//!
//! Resolves memberships and access decisions against a JSON snapshot of the
//! group store and identity directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use groupauthz::{telemetry, AuthzConfig, AuthzService, Group, JsonFileStore, Stores};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "groupauthz")]
#[command(about = "Group membership and application access resolution")]
#[command(version)]
struct Cli {
    /// Snapshot with groups, applications, connections and users
    #[arg(short, long, env = "GROUPAUTHZ_SNAPSHOT")]
    snapshot: PathBuf,

    /// Path to configuration file
    #[arg(short, long, env = "GROUPAUTHZ_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Groups a user belongs to, directly or through nesting
    UserGroups { user_id: String },

    /// Groups granted by connection claims
    DynamicGroups {
        connection: String,
        claims: Vec<String>,
    },

    /// Child closure of the given groups
    Children {
        #[arg(required = true)]
        group_ids: Vec<String>,
    },

    /// Parent closure of the given groups
    Parents {
        #[arg(required = true)]
        group_ids: Vec<String>,
    },

    /// Every user in a group's child closure
    Members { group_id: String },

    /// Decide application access for a set of group ids
    Access {
        client_id: String,
        group_ids: Vec<String>,
    },

    /// Mappings of a group with their connection labels
    Mappings { group_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AuthzConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AuthzConfig::default(),
    };
    config.apply_env().context("invalid environment override")?;
    config.validate().context("invalid configuration")?;

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    telemetry::init_tracing(level);

    let store = Arc::new(
        JsonFileStore::open(&cli.snapshot)
            .await
            .with_context(|| format!("failed to open snapshot {}", cli.snapshot.display()))?,
    );
    info!(
        snapshot = %store.path().display(),
        "groupauthz v{}",
        groupauthz::VERSION
    );

    let service = AuthzService::new(&config, Stores::from_shared(store.clone()));

    let outcome = run(&service, store.as_ref(), cli.command).await;

    let stats = service.cache_stats();
    debug!(
        groups_hit_rate = stats.groups.hit_rate(),
        applications_hit_rate = stats.applications.hit_rate(),
        connections_hit_rate = stats.connections.hit_rate(),
        connection_lookup_hit_rate = stats.connection_lookup.hit_rate(),
        "cache statistics"
    );

    outcome
}

async fn run(service: &AuthzService, store: &JsonFileStore, command: Command) -> Result<()> {
    match command {
        Command::UserGroups { user_id } => {
            print_json(&service.membership().user_groups(&user_id).await?)
        }
        Command::DynamicGroups { connection, claims } => {
            print_json(&service.dynamic().resolve(Some(&connection), &claims).await?)
        }
        Command::Children { group_ids } => {
            let groups = service.cache().groups(store).await?;
            print_json(&closure(&groups, &group_ids, true))
        }
        Command::Parents { group_ids } => {
            let groups = service.cache().groups(store).await?;
            print_json(&closure(&groups, &group_ids, false))
        }
        Command::Members { group_id } => {
            print_json(&service.membership().nested_members(&group_id).await?)
        }
        Command::Access { client_id, group_ids } => {
            let allowed = service.access().check(&client_id, &group_ids).await?;
            print_json(&serde_json::json!({ "clientId": client_id, "allowed": allowed }))
        }
        Command::Mappings { group_id } => {
            print_json(&service.membership().mapping_names(&group_id).await?)
        }
    }
}

fn closure<'a>(groups: &'a [Group], seeds: &[String], children: bool) -> Vec<&'a Group> {
    if children {
        groupauthz::child_closure(groups, seeds)
    } else {
        groupauthz::parent_closure(groups, seeds)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{}", output);
    Ok(())
}

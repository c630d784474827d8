//! Operator tool for the authorization core
//!
//! Connects to PostgreSQL and Redis, applies migrations, seeds an empty
//! database and runs one administrative command, printing its result as
//! JSON.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`, `DATABASE_MIN_CONNECTIONS`,
//!   `DATABASE_CONNECTION_TIMEOUT`
//! - `REDIS_URL`, `REDIS_CONNECTION_TIMEOUT_MS`
//! - `AUTHZ_CACHE_TTL_SECONDS`, `AUTHZ_CACHE_TIMEOUT_MS`, `AUTHZ_SEED_ON_EMPTY`
//! - `RUST_LOG`: log filter (default: `info`)

use anyhow::{Context, Result};
use authz::{
    AuthzConfig, AuthzService, bootstrap,
    cache::RedisPermissionCache,
    models::{Actor, OperationRequirement, UpdateRole},
    store::{PgRoleStore, postgres::migrate},
};
use clap::{Parser, Subcommand};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "authz")]
#[command(version, about = "Role and permission administration", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the catalog if no role exists yet
    Bootstrap,
    /// Re-seed the catalog, resetting system roles to their default grants
    Seed,
    /// List roles with their permission codes
    Roles,
    /// Show one role
    Role { id: Uuid },
    /// List permissions grouped by module
    Permissions,
    /// Resolve the permission codes of a role
    Resolve { role: String },
    /// Decide whether a role holds every given permission
    Check {
        role: String,
        permissions: Vec<String>,
    },
    /// Create a custom role
    CreateRole {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename or redescribe a custom role
    UpdateRole {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a custom role
    DeleteRole { id: Uuid },
    /// Replace the permissions of a role
    SetPermissions {
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AuthzConfig::from_env()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    if !health_check(&pool).await? {
        anyhow::bail!("Failed to connect to database");
    }
    migrate(&pool).await?;

    let redis_config = RedisConfig::from_env()?;
    if config.cache_timeout() < redis_config.connection_timeout {
        warn!(
            "AUTHZ_CACHE_TIMEOUT_MS ({:?}) is shorter than REDIS_CONNECTION_TIMEOUT_MS ({:?}); \
             slow Redis commands will be abandoned by the resolver and the connection reopened",
            config.cache_timeout(),
            redis_config.connection_timeout
        );
    }
    let redis_pool = Arc::new(RedisPool::new(&redis_config)?);

    let service = AuthzService::new(
        Arc::new(PgRoleStore::new(pool.clone())),
        Arc::new(RedisPermissionCache::new(redis_pool.clone())),
        &config,
    );

    let result = run(&service, &config, args.command).await;

    redis_pool.close().await;
    pool.close().await;

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(service: &AuthzService, config: &AuthzConfig, command: Command) -> Result<Value> {
    if !matches!(command, Command::Seed) {
        bootstrap(service, config)
            .await
            .context("Failed to seed the permission catalog")?;
    }

    let output = match command {
        Command::Bootstrap => json!({ "status": "ok" }),
        Command::Seed => {
            let report = service.seed().await.context("Re-seeding failed")?;
            info!("Catalog re-seeded");
            json!({ "status": "ok", "seeded": report })
        }
        Command::Roles => json!(service.list_roles().await?),
        Command::Role { id } => json!(service.get_role(id).await?),
        Command::Permissions => json!(service.list_permissions().await?),
        Command::Resolve { role } => json!(service.resolve_permissions(&role).await?),
        Command::Check { role, permissions } => {
            let actor = Actor::new(Uuid::nil(), role);
            let requirement = OperationRequirement::all_of(permissions);
            let allowed = service.decide(&requirement, Some(&actor)).await?;
            json!({ "allowed": allowed })
        }
        Command::CreateRole {
            code,
            name,
            description,
        } => json!(service.create_role(&code, &name, description).await?),
        Command::UpdateRole {
            id,
            name,
            description,
        } => json!(service.update_role(id, UpdateRole { name, description }).await?),
        Command::DeleteRole { id } => {
            service.delete_role(id).await?;
            json!({ "status": "deleted" })
        }
        Command::SetPermissions {
            role_id,
            permission_ids,
        } => json!(
            service
                .replace_role_permissions(role_id, &permission_ids)
                .await?
        ),
    };

    Ok(output)
}

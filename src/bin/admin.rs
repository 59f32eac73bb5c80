//! CLI administration tool for tinylink.
//!
//! Issues and revokes sessions, inspects links and checks the database without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Issue an access/refresh pair for user 42 (development login glue)
//! cargo run --bin admin -- session issue --user-id 42
//!
//! # Revoke user 42's refresh credential
//! cargo run --bin admin -- session revoke --user-id 42
//!
//! # List links of a user or a guest
//! cargo run --bin admin -- links list --user-id 42
//! cargo run --bin admin -- links list --guest 9b2f...
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Reads the same configuration as the server. Only the postgres backend is
//! meaningful here; the in-memory stores live inside the server process.

use tinylink::application::services::{CredentialSigner, IdentityResolver, TokenService};
use tinylink::config::{self, Config, StorageBackend};
use tinylink::domain::entities::Identity;
use tinylink::domain::repositories::LinkStore;
use tinylink::server;
use tinylink::state::{DynIdentityResolver, TOKEN_ISSUER};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;

/// CLI tool for managing tinylink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Inspect links
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Issue an access and refresh credential for a user
    Issue {
        #[arg(long)]
        user_id: u64,
    },

    /// Revoke a user's refresh credential
    Revoke {
        #[arg(long)]
        user_id: u64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LinksAction {
    /// List the links of one owner
    List(OwnerArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct OwnerArgs {
    #[arg(long)]
    user_id: Option<u64>,

    /// Guest UUID from the `tl_guest` cookie
    #[arg(long)]
    guest: Option<String>,
}

impl OwnerArgs {
    fn identity(&self) -> Result<Identity> {
        match (self.user_id, &self.guest) {
            (Some(id), _) => Ok(Identity::user(id)),
            (None, Some(uuid)) => {
                Identity::guest_from_cookie(uuid).context("Guest id must be a UUID")
            }
            (None, None) => anyhow::bail!("Either --user-id or --guest is required"),
        }
    }
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    if config.storage_backend != StorageBackend::Postgres {
        anyhow::bail!("The admin tool requires STORAGE_BACKEND=postgres");
    }

    match cli.command {
        Commands::Session { action } => handle_session_action(action, &config).await?,
        Commands::Links { action } => handle_links_action(action, &config).await?,
        Commands::Db { action } => handle_db_action(action, &config).await?,
    }

    Ok(())
}

async fn resolver(config: &Config) -> Result<DynIdentityResolver> {
    let stores = server::connect_stores(config).await?;

    let signer = Arc::new(CredentialSigner::new(
        config.token_signing_secret.as_bytes(),
        TOKEN_ISSUER,
        chrono::Duration::seconds(config.access_token_ttl_seconds),
    ));
    let tokens = Arc::new(TokenService::new(
        stores.tokens,
        config.token_signing_secret.clone(),
        chrono::Duration::seconds(config.refresh_token_ttl_seconds),
        std::time::Duration::from_millis(config.store_timeout_ms),
    ));

    Ok(IdentityResolver::new(signer, tokens))
}

async fn handle_session_action(action: SessionAction, config: &Config) -> Result<()> {
    let resolver = resolver(config).await?;

    match action {
        SessionAction::Issue { user_id } => {
            println!("{}", "Issue session".bright_blue().bold());
            println!();

            let session = resolver
                .establish_session(Identity::user(user_id))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to issue session: {}", e))?;

            println!("  Owner:   {}", session.identity.to_string().cyan());
            println!("  Access:  {}", session.access.bright_yellow());
            println!("  Refresh: {}", session.refresh.value.bright_yellow());
            println!(
                "  Refresh expires: {}",
                session
                    .refresh
                    .expires_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .bright_black()
            );
            println!();
            println!("{}", "Any earlier refresh credential of this user is now invalid.".yellow());
            println!();
            println!("{}", "Example:".bright_white());
            println!(
                "  curl -H \"Authorization: Bearer {}\" --cookie \"tl_refresh={}\" http://localhost:3000/api/links",
                session.access.bright_yellow(),
                session.refresh.value.bright_yellow()
            );
            println!();
        }

        SessionAction::Revoke { user_id, yes } => {
            println!("{}", "Revoke session".bright_blue().bold());
            println!();
            println!("  Owner: {}", Identity::user(user_id).to_string().cyan());
            println!();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Revoke this user's refresh credential?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "Cancelled".red());
                    return Ok(());
                }
            }

            resolver
                .logout(&Identity::user(user_id))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to revoke session: {}", e))?;

            println!("{}", "Session revoked".green().bold());
            println!();
        }
    }

    Ok(())
}

async fn handle_links_action(action: LinksAction, config: &Config) -> Result<()> {
    let LinksAction::List(owner) = action;
    let owner = owner.identity()?;
    let stores = server::connect_stores(config).await?;

    println!("{} {}", "Links of".bright_blue().bold(), owner.to_string().cyan());
    println!();

    let links = stores
        .links
        .list_by_owner(&owner)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list links: {}", e))?;

    if links.is_empty() {
        println!("{}", "  No links found".yellow());
        return Ok(());
    }

    println!(
        "  {:<6} {:<20} {:<8} {:<8} {}",
        "ID".bright_white().bold(),
        "Alias".bright_white().bold(),
        "Private".bright_white().bold(),
        "Visits".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "-".repeat(75).bright_black());

    for link in &links {
        let alias = if link.is_expired() {
            link.alias.red()
        } else {
            link.alias.cyan()
        };

        println!(
            "  {:<6} {:<20} {:<8} {:<8} {}",
            link.id.to_string().bright_black(),
            alias,
            if link.private { "yes" } else { "no" },
            link.usage_count,
            link.url
        );
    }

    println!();
    println!("  Total: {}", links.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

async fn handle_db_action(action: DbAction, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            let pool = server::connect_pool(config).await?;
            let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await?;

            if result == 1 {
                println!("{}", "Database connection OK".green().bold());

                let version: String = sqlx::query_scalar("SELECT version()")
                    .fetch_one(&pool)
                    .await?;
                println!("  {}", version.bright_black());

                let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tinylinks")
                    .fetch_one(&pool)
                    .await?;
                let sessions: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE expires_at > NOW()")
                        .fetch_one(&pool)
                        .await?;
                println!("  Links:           {}", links.to_string().bright_green().bold());
                println!("  Active sessions: {}", sessions.to_string().bright_green().bold());
            }
        }
    }

    Ok(())
}

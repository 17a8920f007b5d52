//! Gadget Pulse CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! gp-cli migrate
//!
//! # Promote an existing account to superadmin
//! gp-cli admin promote -e admin@example.com
//!
//! # List admins
//! gp-cli admin list --page 2 --limit 20
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin promote` - Grant superadmin to a registered account
//! - `admin list` - Print one page of admins

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gp-cli")]
#[command(author, version, about = "Gadget Pulse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Promote an existing account to superadmin
    Promote {
        /// Email of the registered account
        #[arg(short, long)]
        email: String,
    },
    /// List admins, newest first
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Admins per page (max 100)
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
            AdminAction::List { page, limit } => commands::admin::list(page, limit).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_admin_list_defaults() {
        let cli = Cli::try_parse_from(["gp-cli", "admin", "list"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Admin {
                action: AdminAction::List { page: 1, limit: 10 }
            }
        ));
    }
}

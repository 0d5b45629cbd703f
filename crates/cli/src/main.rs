//! Ecommerce CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ecommerce-cli migrate
//!
//! # Promote a registered user to administrator
//! ecommerce-cli admin grant -e admin@example.com
//!
//! # Demote an administrator back to a regular user
//! ecommerce-cli admin revoke -e admin@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin grant|revoke` - Change the role of an existing account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ecommerce-cli")]
#[command(author, version, about = "Ecommerce backend CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the administrator role
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an administrator to the regular user role
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
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
            AdminAction::Grant { email } => {
                commands::admin::set_role(&email, ecommerce_core::Role::Admin).await?;
            }
            AdminAction::Revoke { email } => {
                commands::admin::set_role(&email, ecommerce_core::Role::User).await?;
            }
        },
    }
    Ok(())
}

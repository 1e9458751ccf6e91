//! Marketplace CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mp-cli migrate
//!
//! # Ensure the configured seed categories exist
//! mp-cli seed categories
//!
//! # Ensure specific categories exist
//! mp-cli seed categories --name Garden --name Toys
//!
//! # Create an admin account
//! mp-cli user create -e admin@example.com -p 'long passphrase' -r admin
//!
//! # Promote or demote an existing account
//! mp-cli user set-role -e someone@example.com -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed categories` - Insert missing categories
//! - `user create` / `user set-role` - Manage accounts and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "Marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Ensure categories exist (defaults to `MARKETPLACE_SEED_CATEGORIES`)
    Categories {
        /// Category name (repeatable)
        #[arg(short, long = "name")]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Username (defaults to the local part of the email)
        #[arg(short, long)]
        username: Option<String>,

        /// Role (`buyer`, `admin`)
        #[arg(short, long, default_value = "buyer")]
        role: String,
    },
    /// Change the role of an existing account
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Role (`buyer`, `admin`)
        #[arg(short, long)]
        role: String,
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
        Commands::Seed { target } => match target {
            SeedTarget::Categories { names } => {
                commands::seed::categories(&names).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                username,
                role,
            } => {
                commands::user::create(&email, &password, username.as_deref(), &role).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}

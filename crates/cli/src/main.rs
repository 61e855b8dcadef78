//! FreshMall CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! freshmall-cli migrate
//!
//! # Load goods types, goods and SKUs from a YAML file
//! freshmall-cli seed goods catalogue.yaml
//!
//! # Store a SKU image in the media store
//! freshmall-cli media upload 3 strawberry.jpg
//!
//! # Activate an account without the e-mail link
//! freshmall-cli user activate alice01
//!
//! # Look up the outcome of a background task
//! freshmall-cli task status 0b6f6c1e-3c1a-4d69-9f7e-0e7c7f0f7a55
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "freshmall-cli")]
#[command(author, version, about = "FreshMall CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage media files
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inspect background tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load goods types, goods and SKUs from a YAML file
    Goods {
        /// Path to the catalogue YAML file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum MediaAction {
    /// Store an image and attach it to a SKU
    Upload {
        /// SKU id
        sku_id: i32,
        /// Image file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Activate a registered user
    Activate {
        /// Username
        username: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Show the stored result of a task
    Status {
        /// Task id
        id: Uuid,
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
            SeedTarget::Goods { file } => commands::seed::goods(&file).await?,
        },
        Commands::Media { action } => match action {
            MediaAction::Upload { sku_id, file } => commands::media::upload(sku_id, &file).await?,
        },
        Commands::User { action } => match action {
            UserAction::Activate { username } => commands::user::activate(&username).await?,
        },
        Commands::Task { action } => match action {
            TaskAction::Status { id } => commands::task::status(id).await?,
        },
    }
    Ok(())
}

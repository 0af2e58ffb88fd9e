//! BookBazaar CLI - migrations, mirror management, and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bb-cli migrate
//!
//! # Provision / verify the secondary mirror store and topic
//! bb-cli mirror setup
//! bb-cli mirror verify
//!
//! # Seed demo data from comma-delimited text files
//! bb-cli seed users data/users.csv
//! bb-cli seed books data/books.csv
//! bb-cli seed orders data/orders.csv
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `mirror setup` - Verify the mirror endpoint and write namespace markers
//! - `mirror verify` - Check mirror and topic connectivity end to end
//! - `seed` - Load demo users/books/orders (doubles as a mirror reseed)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bb-cli")]
#[command(author, version, about = "BookBazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the secondary mirror store and notification topic
    Mirror {
        #[command(subcommand)]
        action: MirrorAction,
    },
    /// Seed demo data from comma-delimited text files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MirrorAction {
    /// Verify the endpoint and write per-entity namespace markers
    Setup,
    /// Check mirror and topic connectivity end to end
    Verify,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed user accounts (username,email,password,role,is_validated)
    Users {
        /// Path to the delimited text file
        file: String,
    },
    /// Seed books (title,author,description,price,stock,image_url,seller_username)
    Books {
        /// Path to the delimited text file
        file: String,
    },
    /// Seed orders (buyer_username,book_title,quantity,total_price,status)
    Orders {
        /// Path to the delimited text file
        file: String,
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
        Commands::Mirror { action } => match action {
            MirrorAction::Setup => commands::mirror::setup().await?,
            MirrorAction::Verify => commands::mirror::verify().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Users { file } => commands::seed::users(&file).await?,
            SeedTarget::Books { file } => commands::seed::books(&file).await?,
            SeedTarget::Orders { file } => commands::seed::orders(&file).await?,
        },
    }
    Ok(())
}

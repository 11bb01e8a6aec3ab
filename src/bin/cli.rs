//! TradeQuest CLI
//!
//! Operator tooling that works directly on the database:
//! - Generate a config file or an encryption key
//! - Create users and issue API tokens
//! - Grant upload credits
//! - Run the scheduled jobs once

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use tradequest::config::{generate_default_config, Config};
use tradequest::crypto::CredentialCipher;
use tradequest::jobs::{DailyChallengesJob, InactivityScanJob, Job, JobOutcome};
use tradequest::storage::Database;

#[derive(Parser)]
#[command(name = "tradequest-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Administration tool for the TradeQuest trading journal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations plus environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the configured one
    #[arg(long, global = true)]
    pub database: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a random credential encryption key
    GenKey,

    /// Create a user and print an API token for it
    CreateUser {
        username: String,
        #[arg(long)]
        display_name: Option<String>,
        /// Starting upload credits (default: configured amount)
        #[arg(long)]
        credits: Option<i64>,
    },

    /// Issue an additional API token for an existing user
    IssueToken { username: String },

    /// Add upload credits to a user's balance
    GrantCredits { username: String, amount: i64 },

    /// Seed today's daily challenges for every user
    SeedChallenges,

    /// Notify users who have been away
    ScanInactive,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(database) = &cli.database {
        config.storage.database_path = database.clone();
    }
    Ok(config)
}

fn open_database(config: &Config) -> anyhow::Result<Arc<Database>> {
    let path = &config.storage.database_path;
    let db = Database::open(path).with_context(|| format!("Failed to open database {}", path))?;
    Ok(Arc::new(db))
}

fn print_outcome(name: &str, outcome: &JobOutcome) -> anyhow::Result<()> {
    println!(
        "{}: {} processed, {} failed",
        name, outcome.processed, outcome.failed
    );
    println!("{}", serde_json::to_string_pretty(&outcome.detail)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }

        Commands::GenKey => {
            println!("{}", CredentialCipher::generate_hex_key());
        }

        Commands::CreateUser {
            username,
            display_name,
            credits,
        } => {
            let config = load_config(&cli)?;
            let db = open_database(&config)?;
            let now = Utc::now();

            let credits = credits.unwrap_or(config.credits.starting_credits);
            let user = db.create_user(username, display_name.as_deref(), credits, now)?;
            let token = db.issue_token(&user.id, now)?;

            println!("Created user {} ({})", user.username, user.id);
            println!("Upload credits: {}", credits);
            println!("Token: {}", token);
        }

        Commands::IssueToken { username } => {
            let config = load_config(&cli)?;
            let db = open_database(&config)?;

            let user = db
                .get_user_by_username(username)
                .with_context(|| format!("No user named {}", username))?;
            println!("{}", db.issue_token(&user.id, Utc::now())?);
        }

        Commands::GrantCredits { username, amount } => {
            let config = load_config(&cli)?;
            let db = open_database(&config)?;

            let user = db
                .get_user_by_username(username)
                .with_context(|| format!("No user named {}", username))?;
            let account = db.grant_credits(&user.id, *amount)?;
            println!(
                "{} now has {} upload credits ({} used so far)",
                user.username, account.balance, account.lifetime_used
            );
        }

        Commands::SeedChallenges => {
            let config = load_config(&cli)?;
            let db = open_database(&config)?;

            let job = DailyChallengesJob::new(db, config.gamification.clone());
            let outcome = job.run(Utc::now()).await?;
            print_outcome(job.name(), &outcome)?;
        }

        Commands::ScanInactive => {
            let config = load_config(&cli)?;
            let db = open_database(&config)?;

            let job = InactivityScanJob::new(
                db,
                config.gamification.comeback,
                config.jobs.inactivity_days,
                config.jobs.notification_cooldown_days,
            );
            let outcome = job.run(Utc::now()).await?;
            print_outcome(job.name(), &outcome)?;
        }
    }

    Ok(())
}

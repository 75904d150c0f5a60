//! Jenkins Relay CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the credential store tables
//! jr-cli migrate
//!
//! # Generate a value for JENKINS_ENCRYPTION_KEY
//! jr-cli keygen
//!
//! # Show how slash command arguments resolve to a job and build
//! jr-cli parse '"folder with space/my job"' 22
//!
//! # Validate the relay's environment without starting it
//! jr-cli check-config
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "jr-cli")]
#[command(author, version, about = "Jenkins Relay CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Generate a random encryption key
    Keygen {
        /// Key length in bytes (16, 24 or 32)
        #[arg(short, long, default_value_t = 32)]
        length: usize,
    },
    /// Parse `<job> [build]` arguments the way slash commands do
    Parse {
        /// Argument words, as Mattermost splits them
        #[arg(required = true)]
        args: Vec<String>,
    },
    /// Load and validate the relay configuration
    CheckConfig,
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
        Commands::Keygen { length } => commands::keygen::run(length)?,
        Commands::Parse { args } => commands::parse::run(&args),
        Commands::CheckConfig => commands::check_config()?,
    }
    Ok(())
}

//! The qwest command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "qwest", version, about = "Educational matching-game session engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game session in the terminal
    Play {
        /// Player profile name
        #[arg(long)]
        profile: String,

        /// Question bank to play, as "id@version"
        #[arg(long)]
        bank: Option<String>,

        /// Resume a saved session instead of starting a new one
        #[arg(long)]
        resume: Option<Uuid>,

        /// Seed for the question order (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List stored sessions
    Sessions {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a stored session
    Delete {
        /// Session id
        #[arg(long)]
        id: Uuid,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Export a session as a portable JSON blob
    Export {
        /// Session id
        #[arg(long)]
        id: Uuid,

        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Import a previously exported session
    Import {
        /// Path to the exported blob
        #[arg(long)]
        input: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qwest=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            profile,
            bank,
            resume,
            seed,
            config,
        } => commands::play::execute(profile, bank, resume, seed, config).await,
        Commands::Sessions { format, config } => commands::sessions::execute(format, config).await,
        Commands::Delete { id, config } => commands::delete::execute(id, config).await,
        Commands::Export { id, output, config } => {
            commands::export::execute(id, output, config).await
        }
        Commands::Import { input, config } => commands::import::execute(input, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

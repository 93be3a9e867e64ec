//! Sightline Control - CLI client for the Sightline daemon
//!
//! Sends image analyses and follow-up questions to sightd.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sightctl::client::SightClient;
use sightctl::commands::{self, AskOptions};
use sightctl::session::SessionStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sightctl")]
#[command(about = "Sightline - ask questions about what the camera sees", long_about = None)]
#[command(version)]
struct Cli {
    /// sightd base URL
    #[arg(long, env = "SIGHT_SERVER", default_value = sight_common::DEFAULT_SERVER_URL)]
    server: String,

    /// Session file (default: user cache dir)
    #[arg(long, env = "SIGHT_SESSION")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe an image and remember it for follow-up questions
    Analyze {
        /// JPEG still frame
        image: PathBuf,

        /// Custom instruction instead of the default description prompt
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Ask a follow-up question about the last analyzed image
    Ask {
        question: String,

        /// Send this image instead of the stored one
        #[arg(long)]
        image: Option<PathBuf>,

        /// Audio clip to include
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Web search results to answer from
        #[arg(long)]
        search: Option<String>,

        /// Ignore the stored image and description
        #[arg(long)]
        fresh: bool,
    },

    /// Show daemon health and backend reachability
    Status,

    /// Forget the stored image and description
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet unless RUST_LOG asks for more
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.session {
        Some(path) => SessionStore::new(path),
        None => SessionStore::default_location(),
    };

    match cli.command {
        Commands::Reset => commands::reset(&store),
        command => {
            let client = SightClient::new(&cli.server)?;
            match command {
                Commands::Analyze { image, prompt } => {
                    commands::analyze(&client, &store, &image, prompt).await
                }
                Commands::Ask {
                    question,
                    image,
                    audio,
                    search,
                    fresh,
                } => {
                    let opts = AskOptions {
                        question,
                        image,
                        audio,
                        search,
                        fresh,
                    };
                    commands::ask(&client, &store, opts).await
                }
                Commands::Status => commands::status(&client).await,
                Commands::Reset => commands::reset(&store),
            }
        }
    }
}

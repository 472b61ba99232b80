mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use reelkit_core::{
    bootstrap::{init_services, load_config},
    logging,
};

#[derive(Parser, Debug)]
#[command(name = "reelkit")]
#[command(about = "Provider testing and cached link playback", long_about = None)]
struct Args {
    /// Config file (YAML)
    #[arg(long, short, env = "REELKIT_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured providers
    Providers,

    /// Run the provider test battery
    Test {
        /// Providers to test (defaults to every configured provider)
        #[arg(long = "provider", short)]
        providers: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve links for a film and load them into a headless player
    Play {
        #[arg(long, short)]
        provider: String,

        /// Film id on the provider
        #[arg(long, short)]
        film: String,

        /// Season number (TV shows)
        #[arg(long, default_value = "1")]
        season: u32,

        /// Episode number (TV shows)
        #[arg(long, default_value = "1")]
        episode: u32,

        /// Prefetch the next episode after loading
        #[arg(long)]
        queue_next: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("reelkit starting...");

    // 3. Initialize services
    let services = init_services(&config)?;

    match args.command {
        Command::Providers => commands::list_providers(&services),
        Command::Test { providers, json } => {
            commands::run_provider_tests(&services, &providers, json).await
        }
        Command::Play {
            provider,
            film,
            season,
            episode,
            queue_next,
        } => {
            commands::play(
                &services,
                commands::PlayRequest {
                    provider_id: provider.into(),
                    film_id: film,
                    season,
                    episode,
                    queue_next,
                },
            )
            .await
        }
    }
}

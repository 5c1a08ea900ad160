pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use clap::Parser;
pub use config::Config;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init` must work before any config exists.
    if matches!(cli.command, Some(Commands::Init)) {
        return cli::cmd_init();
    }

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::cmd_serve(config).await,
        Commands::Setup => cli::cmd_setup(&config).await,
        Commands::Users => cli::cmd_list_users(&config).await,
        Commands::Activate { username } => cli::cmd_set_active(&config, &username, true).await,
        Commands::Deactivate { username } => {
            cli::cmd_set_active(&config, &username, false).await
        }
        Commands::Reset { yes } => cli::cmd_reset(&config, yes).await,
        Commands::Init => cli::cmd_init(),
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

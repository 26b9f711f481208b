mod cli;
mod config;
mod sheets;
mod stock;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use cli::commands::{Session, check_names, extras, images, sync};
use cli::{Cli, Commands};
use config::{Config, resolve_config_path, resolve_token_path};
use sheets::{OAuthToken, SheetDocument, SheetsClient};

fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

fn open_session(cli: &Cli) -> Result<Session> {
    let config_path = resolve_config_path(cli.config.as_deref());
    log::debug!("Using config file {}", config_path.display());
    let config = Config::load(&config_path)?;

    let token_path = resolve_token_path(cli.token.as_deref());
    log::debug!("Using token file {}", token_path.display());
    let token = OAuthToken::load(&token_path)?;

    let client = SheetsClient::new(&config.drive.spreadsheet, token, config.transport.timeout())?
        .with_retry(config.transport.retry())
        .with_base_url(config.transport.api_base.trim_end_matches('/'));
    let doc = SheetDocument::new(Arc::new(client), config.drive.sheet_label.clone());

    Ok(Session { config, doc })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log.filter());

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut session = open_session(&cli)?;

    match cli.command {
        Commands::Sync(args) => sync::handle_sync_command(&mut session, args).await,
        Commands::CheckNames { export } => {
            check_names::handle_check_names_command(&mut session, &export).await
        }
        Commands::Extras { export, output } => {
            extras::handle_extras_command(&mut session, &export, output.as_deref()).await
        }
        Commands::Images { urls, dry_run } => {
            images::handle_images_command(&mut session, &urls, dry_run).await
        }
    }
}

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands, ConfigCommand};
use pubmed2endnote::build_orchestrator;
use pubmed2endnote::config::{is_valid_identity, Config, ConfigStore, FileConfigStore};
use pubmed2endnote::feedback::{
    NoticeConfigurationSurface, PromptConfigurationSurface, TerminalFeedback,
};
use pubmed2endnote::orchestrator::{BackgroundRequest, ConfigurationSurface};
use pubmed2endnote::outcome::Outcome;
use pubmed2endnote::relay::ProcessChannel;
use pubmed2endnote::trigger::{TriggerController, TriggerOutcome};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = Arc::new(match cli.config {
        Some(path) => FileConfigStore::new(path),
        None => FileConfigStore::from_default_path()?,
    });

    match cli.command {
        Commands::Export { page, quiet } => handle_export(&page, quiet, store).await,
        Commands::Config { command } => {
            handle_config(command, store)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => handle_check(store.path()),
        Commands::Request => handle_request(store).await,
    }
}

async fn handle_export(page: &str, quiet: bool, store: Arc<FileConfigStore>) -> Result<ExitCode> {
    let config = Config::load_from(store.path())?;
    let surface = Arc::new(PromptConfigurationSurface::new(store.clone()));
    let orchestrator = build_orchestrator(&config, surface)?;

    // Terminal output stays on screen, so there is nothing to revert after the notification.
    let Some(trigger) = TriggerController::for_page(
        page,
        store,
        Arc::new(orchestrator),
        Arc::new(TerminalFeedback::new(quiet)),
        Duration::ZERO,
    ) else {
        bail!("No PubMed record identifier found in '{page}'");
    };

    match trigger.activate().await {
        TriggerOutcome::Completed(Outcome::Success) | TriggerOutcome::ConfigurationRequested => {
            Ok(ExitCode::SUCCESS)
        }
        TriggerOutcome::Completed(Outcome::Failure(_)) | TriggerOutcome::Busy => {
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_config(command: ConfigCommand, store: Arc<FileConfigStore>) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = Config::load_from(store.path())?;
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("# {}\n", store.path().display());
            print!("{rendered}");
            if config.email.is_none() {
                println!("\n# No contact email set. Run: pm2en config set-email <EMAIL>");
            }
        }
        ConfigCommand::SetEmail { email } => {
            let email = email.trim();
            if !is_valid_identity(email) {
                bail!("Please enter a valid email address");
            }
            store.set(email)?;
            println!("✓ Settings saved successfully!");
        }
        ConfigCommand::Edit => {
            PromptConfigurationSurface::new(store).open();
        }
        ConfigCommand::Path => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}

fn handle_check(config_path: &Path) -> Result<ExitCode> {
    let config = Config::load_from(config_path)?;
    let mut ready = true;

    match config.email.as_deref().map(str::trim) {
        Some(email) if is_valid_identity(email) => println!("✓ Contact email: {email}"),
        _ => {
            ready = false;
            println!("✗ Contact email not set (pm2en config set-email <EMAIL>)");
        }
    }

    let channel = ProcessChannel::from_config(&config.helper);
    match channel.resolve() {
        Ok(launch) if launch.program.is_file() => {
            println!("✓ Helper '{}': {}", channel.name(), launch.program.display());
        }
        Ok(launch) => {
            ready = false;
            println!(
                "✗ Helper '{}' points to a missing file: {}",
                channel.name(),
                launch.program.display()
            );
        }
        Err(e) => {
            ready = false;
            println!("✗ {e}");
        }
    }

    Ok(if ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_request(store: Arc<FileConfigStore>) -> Result<ExitCode> {
    let config = Config::load_from(store.path())?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request: BackgroundRequest =
        serde_json::from_str(&input).context("Failed to parse background request")?;

    // stdout carries the JSON response, so settings hints go to stderr only.
    let orchestrator = build_orchestrator(&config, Arc::new(NoticeConfigurationSurface))?;
    match orchestrator.dispatch(request).await {
        Some(response) => {
            println!("{}", serde_json::to_string(&response)?);
            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

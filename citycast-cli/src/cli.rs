use std::io::Write;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio::io::{AsyncBufReadExt, BufReader};

use citycast_core::{Config, Dashboard, SearchSettings, ServiceId, Sources, validate_place};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather dashboard")]
pub struct Cli {
    /// Log pipeline activity to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key of a service, e.g. "openweather" or "unsplash".
    Configure {
        service: String,
    },

    /// Search once and print the dashboard.
    Show {
        /// Place name; falls back to the configured default city.
        place: Option<String>,

        /// Print the dashboard state as JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Interactive dashboard: type a place name to search, `:q` to quit.
    Dashboard {
        /// First place to show; falls back to the configured default city.
        place: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { service } => configure(&service),
            Command::Show { place, json } => show(place, json).await,
            Command::Dashboard { place } => dashboard(place).await,
        }
    }
}

/// Config from disk with environment overrides applied.
fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    config.apply_env_overrides();
    Ok(config)
}

fn configure(service: &str) -> anyhow::Result<()> {
    let id = ServiceId::try_from(service)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("{id} API key:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow!("API key for '{id}' must not be empty"));
    }
    config.upsert_api_key(id, api_key);

    if config.default_city().is_none() {
        let city = Text::new("Default city (optional):")
            .prompt_skippable()
            .context("Failed to read default city")?;
        config.default_city = city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    }

    config.save()?;
    println!("Saved {id} settings to {}", Config::config_file_path()?.display());

    Ok(())
}

fn resolve_place(place: Option<String>, config: &Config) -> anyhow::Result<String> {
    place
        .or_else(|| config.default_city().map(str::to_string))
        .ok_or_else(|| {
            anyhow!(
                "No place given and no default city configured.\n\
                 Hint: pass a place name, e.g. `citycast show \"New York\"`."
            )
        })
}

async fn show(place: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let sources = Sources::from_config(&config)?;

    let place = resolve_place(place, &config)?;
    let place = validate_place(&place)?.to_string();

    let settings = SearchSettings { default_city: None, ..SearchSettings::from_config(&config) };
    let dashboard = Dashboard::spawn(sources, settings);
    dashboard.search(place);

    // conditions and forecast run one after the other
    let budget = config.request_timeout() * 2 + std::time::Duration::from_secs(1);
    let state = match tokio::time::timeout(budget, dashboard.settled()).await {
        Ok(state) => state,
        Err(_) => {
            tracing::warn!("search did not settle in time, showing what arrived");
            dashboard.snapshot()
        }
    };
    dashboard.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", render::dashboard(&state, chrono::Utc::now()));
    }

    Ok(())
}

async fn dashboard(place: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let sources = Sources::from_config(&config)?;

    let mut settings = SearchSettings::from_config(&config);
    if let Some(place) = place {
        settings.default_city = Some(place);
    }
    if settings.default_city.is_none() {
        println!("Type a place name and press Enter. `:q` quits.");
    }

    let dashboard = Dashboard::spawn(sources, settings);
    let mut state_rx = dashboard.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_revision = 0;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                if state.revision != shown_revision {
                    shown_revision = state.revision;
                    print!("{}", render::screen(&state, chrono::Utc::now()));
                } else if let Some(time) = state.local_time.as_deref() {
                    print!("{}", render::tick(time));
                }
                stdout.flush().context("Failed to write to stdout")?;
            }
            line = lines.next_line() => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim() == ":q" => break,
                    Some(line) => dashboard.search(line),
                    None => break,
                }
            }
        }
    }

    dashboard.shutdown().await;
    println!();
    Ok(())
}

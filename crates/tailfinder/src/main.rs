//! `tailfind` - CLI for tailfinder
//!
//! This binary drives the search form and details view from the terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use tailfinder::cli::{
    Cli, Command, ConfigCommand, OpenCommand, OutputFormat, ProviderCommand, RecentCommand,
    SearchCommand,
};
use tailfinder::display::{render_not_found, render_recent, render_view, ViewReport};
use tailfinder::logging::Verbosity;
use tailfinder::search::parse_date;
use tailfinder::{
    init_logging, Config, DetailsView, HttpLookupClient, LookupRequest, Provider, Route,
    SearchForm, Storage, ViewState,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let verbosity = cli.verbosity();
    init_logging(verbosity);

    match run(cli, verbosity).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, verbosity: Verbosity) -> anyhow::Result<ExitCode> {
    let config_path = cli.config;
    // `config path` and `config validate` must work while the ambient
    // configuration is broken, so loading happens per command.
    let load = || Config::load_from(config_path.clone()).context("loading configuration");

    match cli.command {
        Command::Search(cmd) => handle_search(&load()?, cmd, verbosity).await,
        Command::Open(cmd) => handle_open(&load()?, cmd, verbosity).await,
        Command::Recent(cmd) => handle_recent(&load()?, &cmd, verbosity).await,
        Command::Provider(cmd) => handle_provider(&load()?, &cmd),
        Command::Config(cmd) => handle_config(config_path.clone(), cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening {}", path.display()))
}

async fn handle_search(
    config: &Config,
    cmd: SearchCommand,
    verbosity: Verbosity,
) -> anyhow::Result<ExitCode> {
    let today = Local::now().date_naive();
    let storage = open_storage(config)?;
    let mut form = SearchForm::open(
        &storage,
        config.search.default_provider,
        config.storage.max_recent,
        today,
    )?;

    form.set_flight_number(&cmd.flight);
    if let Some(date) = cmd.date.as_deref() {
        form.set_date(parse_date(date)?);
    }
    if let Some(provider) = cmd.provider {
        form.set_provider(provider.into());
    }

    let route = form.submit()?;
    show_route(config, &storage, route, cmd.format, verbosity).await
}

async fn handle_open(
    config: &Config,
    cmd: OpenCommand,
    verbosity: Verbosity,
) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config)?;
    show_route(config, &storage, Route::parse(&cmd.path), cmd.format, verbosity).await
}

async fn handle_recent(
    config: &Config,
    cmd: &RecentCommand,
    verbosity: Verbosity,
) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config)?;
    let form = SearchForm::open(
        &storage,
        config.search.default_provider,
        config.storage.max_recent,
        Local::now().date_naive(),
    )?;

    if let Some(n) = cmd.run {
        let Some(route) = n.checked_sub(1).and_then(|index| form.select_recent(index)) else {
            bail!("No recent search #{n} ({} stored)", form.recent().len());
        };
        let format = if cmd.json {
            OutputFormat::Json
        } else {
            OutputFormat::Plain
        };
        return show_route(config, &storage, route, format, verbosity).await;
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(form.recent())?);
    } else {
        println!("{}", render_recent(form.recent()));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_provider(config: &Config, cmd: &ProviderCommand) -> anyhow::Result<ExitCode> {
    let storage = open_storage(config)?;
    match cmd.provider {
        Some(arg) => {
            let provider = Provider::from(arg);
            storage.save_provider(provider)?;
            println!("Preferred provider set to {}", provider.label());
        }
        None => {
            let preferences = storage.load(config.storage.max_recent)?;
            let provider = preferences
                .provider
                .unwrap_or(config.search.default_provider);
            println!("{provider} ({})", provider.label());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn show_route(
    config: &Config,
    storage: &Storage,
    route: Route,
    format: OutputFormat,
    verbosity: Verbosity,
) -> anyhow::Result<ExitCode> {
    match route {
        Route::Search => {
            let preferences = storage.load(config.storage.max_recent)?;
            let provider = preferences
                .provider
                .unwrap_or(config.search.default_provider);
            println!("Search for a flight: tailfind search <FLIGHT> [--date YYYY-MM-DD]");
            println!("Provider: {}", provider.label());
            println!();
            println!("{}", render_recent(&preferences.recent));
            Ok(ExitCode::SUCCESS)
        }
        Route::NotFound(path) => {
            println!("{}", render_not_found(&path));
            Ok(ExitCode::FAILURE)
        }
        Route::Details(request) => show_details(config, request, format, verbosity).await,
    }
}

async fn show_details(
    config: &Config,
    request: LookupRequest,
    format: OutputFormat,
    verbosity: Verbosity,
) -> anyhow::Result<ExitCode> {
    let client = HttpLookupClient::new(config.api_base_url(), config.timeout())?;
    let bar = progress_bar(&request, format, verbosity)?;

    let mut view = DetailsView::open(
        Arc::new(client),
        config.progress_settings(),
        request.clone(),
    );
    let state = view
        .run_to_completion(|state| {
            if let ViewState::Loading { progress } = state {
                bar.set_position(u64::from(*progress));
            }
        })
        .await;
    bar.finish_and_clear();

    match format {
        OutputFormat::Json => {
            let report = ViewReport::new(state, &request);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => println!("{}", render_view(state, &request)),
    }

    Ok(if matches!(state, ViewState::Success(_)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn progress_bar(
    request: &LookupRequest,
    format: OutputFormat,
    verbosity: Verbosity,
) -> anyhow::Result<ProgressBar> {
    if format == OutputFormat::Json || verbosity.is_quiet() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} {msg} [{bar:30}] {pos:>3}%",
    )?);
    bar.set_message(format!(
        "{} {} via {}",
        request.flight_number,
        request.date,
        request.provider.label()
    ));
    Ok(bar)
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = &Config::load_from(config_path).context("loading configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", config.api_base_url());
                println!("  Timeout (secs):     {}", config.api.timeout_secs);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Max recent:         {}", config.storage.max_recent);
                println!();
                println!("[Progress]");
                println!("  Step (%):           {}", config.progress.step_percent);
                println!("  Ceiling (%):        {}", config.progress.ceiling_percent);
                println!("  Tick (ms):          {}", config.progress.tick_ms);
                println!("  Settle (ms):        {}", config.progress.settle_ms);
                println!();
                println!("[Search]");
                println!(
                    "  Default provider:   {}",
                    config.search.default_provider
                );
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_file(&path) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

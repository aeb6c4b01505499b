mod archive;
mod cli;
mod commands;
mod config;
mod error;
mod function;
mod progress;
mod resource;
mod runtimes;
mod schema;
mod secret;
mod state;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{ProviderConfig, ProviderSection};
use faaskit::Client;
use function::FunctionEngine;
use schema::{Desired, Manifest};
use state::StateStore;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest: PathBuf,
    pub state_path: PathBuf,
    /// Provider settings from flags and environment, the highest layer
    overrides: ProviderSection,
}

impl Context {
    fn from_cli(cli: &Cli) -> Self {
        let state_path = match &cli.state {
            Some(path) => config::expand_path(path),
            None => manifest_dir(&cli.manifest).join(config::DEFAULT_STATE),
        };
        Self {
            verbose: cli.verbose,
            quiet: cli.quiet,
            manifest: cli.manifest.clone(),
            state_path,
            overrides: ProviderSection {
                endpoint: cli.endpoint.clone(),
                auth_token: cli.auth_token.clone(),
                api_key: cli.api_key.clone(),
                ..Default::default()
            },
        }
    }

    /// Load and validate the manifest
    pub fn desired(&self) -> Result<Desired> {
        schema::load_desired(&self.manifest)
    }

    /// Provider settings with `manifest_section` layered between the user
    /// config and the command line
    pub fn provider(&self, manifest_section: ProviderSection) -> Result<ProviderConfig> {
        let merged = config::load_user_section()?
            .merge(manifest_section)
            .merge(self.overrides.clone());
        ProviderConfig::resolve(merged)
    }

    /// Provider settings for commands that do not need the whole manifest
    ///
    /// Only the `[provider]` table is read, and only if the manifest exists.
    pub fn provider_without_desired(&self) -> Result<ProviderConfig> {
        let section = if self.manifest.exists() {
            Manifest::load(&self.manifest)?.provider
        } else {
            ProviderSection::default()
        };
        self.provider(section)
    }

    /// Engine over the HTTP transport
    pub fn engine(&self, provider: &ProviderConfig) -> FunctionEngine {
        let client = Client::new(provider.http_settings());
        FunctionEngine::new(Arc::new(client), provider.timeouts, provider.pacing)
    }

    /// Open the state file, creating an empty state if it does not exist
    pub fn open_state(&self) -> Result<Arc<StateStore>> {
        let store = StateStore::open(&self.state_path)
            .with_context(|| format!("Failed to open state {}", self.state_path.display()))?;
        Ok(Arc::new(store))
    }
}

fn manifest_dir(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context::from_cli(&cli);

    let result = match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Apply(args) => commands::apply::apply(&ctx, &args),
        Command::Destroy(args) => commands::apply::destroy(&ctx, &args),
        Command::Refresh(args) => commands::refresh::run(&ctx, &args),
        Command::Import(args) => commands::import::run(&ctx, &args),
        Command::Runtimes(args) => commands::runtimes::run(&ctx, &args),
        Command::Show(args) => commands::show::run(&ctx, &args),
        Command::Validate => commands::plan::validate(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "faasform", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

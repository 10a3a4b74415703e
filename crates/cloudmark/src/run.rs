use anyhow::{Context, Result};
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{FileConfig, Settings};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let settings = resolve_settings(&cli.run)?;
    match cli.command {
        Some(Command::ShowConfig) => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        None => {
            let config = settings.into_renderer_config();
            tracing::info!(
                label = %config.label,
                width = config.surface_size.0,
                height = config.surface_size.1,
                fps = ?config.target_fps,
                color_space = %config.color_space,
                "starting cloudmark"
            );
            Renderer::new(config).run()
        }
    }
}

/// Logs go to stderr so `show-config` output stays clean.
fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the config file, then command-line flags.
fn resolve_settings(args: &RunArgs) -> Result<Settings> {
    let paths = AppPaths::discover()?;
    let source = paths.config_source(args.config.as_deref())?;

    let mut settings = Settings::default();
    match source.path() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            let file = FileConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            settings
                .apply_file(file)
                .context("invalid configuration file")?;
        }
        None => {
            tracing::debug!(
                config_dir = %paths.config_dir().display(),
                "no config file; using defaults"
            );
        }
    }
    settings
        .apply_cli(args)
        .context("invalid command-line options")?;
    Ok(settings)
}

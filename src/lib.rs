pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod services;

use clap::Parser;
use cli::{Cli, Commands, HarvestArgs};
pub use config::Config;
use config::LogFormat;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = &cli.command {
        return cli::cmd_init(cli.config.as_deref());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Some(Commands::Harvest(args)) => {
            apply_overrides(&mut config, args);
            config.validate()?;
            cli::cmd_harvest(&config).await
        }
        None => {
            config.validate()?;
            cli::cmd_harvest(&config).await
        }
        Some(Commands::Status { output_dir }) => {
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            cli::cmd_status(&config)
        }
        Some(Commands::Init) => Ok(()),
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.general.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Command-line values take precedence over the config file.
pub fn apply_overrides(config: &mut Config, args: HarvestArgs) {
    if let Some(start_year) = args.start_year {
        config.harvest.start_year = start_year;
    }
    if let Some(limit) = args.limit {
        config.harvest.limit = limit;
    }
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            HarvestArgs {
                start_year: Some(2020),
                limit: Some(25),
                output_dir: Some(PathBuf::from("/tmp/out")),
            },
        );
        assert_eq!(config.harvest.start_year, 2020);
        assert_eq!(config.harvest.limit, 25);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, HarvestArgs::default());
        assert_eq!(config.harvest.start_year, 2010);
        assert_eq!(config.harvest.limit, 15_000);
    }

    #[test]
    fn test_cli_parses_harvest_flags() {
        let cli = Cli::try_parse_from([
            "manhwa-harvest",
            "harvest",
            "--start-year",
            "2018",
            "--limit",
            "10",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Harvest(args)) => {
                assert_eq!(args.start_year, Some(2018));
                assert_eq!(args.limit, Some(10));
                assert!(args.output_dir.is_none());
            }
            _ => panic!("expected harvest command"),
        }
    }

    #[test]
    fn test_cli_without_subcommand() {
        let cli = Cli::try_parse_from(["manhwa-harvest"]).unwrap();
        assert!(cli.command.is_none());
    }
}

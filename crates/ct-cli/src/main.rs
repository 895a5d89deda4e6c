use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_cli::commands::{check, classify, merge, split};
use ct_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Some(Commands::Merge {
            activity,
            snapshots,
            output_dir,
        }) => {
            merge::run(&mut out, &activity, &snapshots, output_dir.as_deref())?;
        }
        Some(Commands::Split {
            input,
            threshold,
            confirm,
            fixtures,
            language,
            json,
        }) => {
            let options = split::Options {
                threshold,
                confirm,
                fixtures,
                language,
                json,
            };
            split::run(&mut out, &config, &input, &options)?;
        }
        Some(Commands::Classify {
            input,
            fixtures,
            language,
            output,
            label,
            partition_dir,
            no_cache,
        }) => {
            let options = classify::Options {
                fixtures,
                language,
                label,
                partition_dir,
                use_cache: !no_cache,
            };
            classify::run(&mut out, &config, &input, output.as_deref(), &options)?;
        }
        Some(Commands::Check {
            source,
            fixtures,
            language,
            exercise,
            json,
        }) => {
            let options = check::Options {
                fixtures,
                language,
                exercise,
                json,
            };
            check::run(&mut out, &config, &source, &options)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

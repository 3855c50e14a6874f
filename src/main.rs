//! frontend-infra - CloudFormation synthesis for a static frontend
//!
//! This is the main entry point for the frontend-infra CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use frontend_infra::config::{Config, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let cli = Cli::parse_args();

    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity())
                .error(&format!("Failed to load config: {:#}", e));
            std::process::exit(2);
        }
    };

    init_logging(cli.verbosity(), &config.logging);

    if cli.verbosity() >= 2 {
        eprintln!("frontend-infra v{}", VERSION);
    }

    let mut ctx = match CommandContext::new(&cli, config) {
        Ok(ctx) => ctx,
        Err(e) => {
            OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity())
                .error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    let exit_code = match run(&cli, &mut ctx) {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };

    ctx.output.flush();
    std::process::exit(exit_code);
}

fn run(cli: &Cli, ctx: &mut CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Synth(args) => args.run(ctx),
        Commands::List(args) => args.run(ctx),
        Commands::Diff(args) => args.run(ctx),
    }
}

/// Map an error to the process exit code of the library error it wraps.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<frontend_infra::error::Error>()
        .map(|e| e.exit_code())
        .unwrap_or(1)
}

/// Initialize logging based on verbosity level
///
/// `RUST_LOG` wins over everything else. Without `-v`, the configured log
/// level applies.
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

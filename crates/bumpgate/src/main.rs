mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, ColorMode, Commands};
use commands::{RepoContext, Status};
use output::{OutputMode, Reporter};
use bumpgate_core::discovery::LayoutOverrides;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Human
    };

    match cli.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let mut reporter = Reporter::new(mode);
    let ctx = RepoContext {
        repo_override: cli.repo.as_deref(),
        overrides: LayoutOverrides {
            plugin_root: cli.plugin_root.clone(),
            manifest: cli.manifest.clone(),
        },
    };

    let status = match &cli.command {
        Commands::Check {
            compare,
            plugin,
            jobs,
            timeout,
        } => {
            commands::check::run_check_command(
                &ctx,
                compare,
                plugin.as_deref(),
                *jobs,
                *timeout,
                &mut reporter,
            )
            .await
        }
        Commands::Changed { compare, plugin } => {
            commands::changed::run_changed(&ctx, compare, plugin.as_deref(), &mut reporter).await
        }
        Commands::Evaluate { file } => commands::evaluate::run_evaluate(file.as_deref(), &mut reporter),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "bumpgate", &mut std::io::stdout());
            Status::Passed
        }
    };

    reporter.finish();

    if status != Status::Passed {
        std::process::exit(status.exit_code());
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over
/// `--log-level`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();
}

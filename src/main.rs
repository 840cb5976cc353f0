//! newsroom - provider routing and autonomous journalist agents
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use newsroom::cli::args::Commands;
use newsroom::cli::{AppContext, Cli, Output};
use newsroom::core::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output {
        format: cli.effective_format(),
        pretty: cli.pretty,
    };

    // Config is resolved before logging so its [general] log settings apply.
    let ctx = AppContext::load(&cli.overrides());
    let flags = logging::LogFlags {
        level: cli.log_level.as_deref(),
        json: cli.json_output,
        verbose: cli.verbose,
    };
    let general = ctx.as_ref().ok().map(|ctx| &ctx.resolved.config.general);
    logging::init(&logging::LogSettings::resolve(
        flags,
        &logging::LogEnv::from_env(),
        general,
    ));

    let result = match ctx {
        Ok(ctx) => run(&ctx, cli.command, output).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("{}", newsroom::render::render_error(&e, output.format, output.pretty));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(ctx: &AppContext, command: Commands, output: Output) -> newsroom::Result<()> {
    match command {
        Commands::Serve(args) => newsroom::cli::serve::execute(ctx, &args).await,
        Commands::Validate(args) => newsroom::cli::validate::execute(ctx, &args, output).await,
        Commands::Generate(args) => newsroom::cli::generate::execute(ctx, &args, output).await,
        Commands::Research(args) => newsroom::cli::research::execute(ctx, &args, output).await,
        Commands::Agents(cmd) => newsroom::cli::agents::execute(ctx, &cmd, output),
        Commands::Deploy(args) => newsroom::cli::deploy::execute(ctx, &args, output).await,
        Commands::Watch(args) => newsroom::cli::watch::execute(ctx, &args, output).await,
    }
}

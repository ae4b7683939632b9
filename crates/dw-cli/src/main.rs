//! dwflow CLI - run, resume and inspect data-warehouse pipelines

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{ddl, plan, run, status};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.global.verbose);

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args, &cli.global).await,
        Commands::Status(args) => status::execute(args, &cli.global).await,
        Commands::Plan(args) => plan::execute(args, &cli.global).await,
        Commands::Ddl(args) => ddl::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

/// `--verbose` lowers the default level to debug; `RUST_LOG` wins over both.
fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .try_init()
        .ok();
}

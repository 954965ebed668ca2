use std::process::ExitCode;

use clap::Parser;
use medlookup::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn run_mcp(cli: &Cli) -> anyhow::Result<()> {
    let lookup = medlookup::cli::build_lookup(cli)?;
    medlookup::mcp::run_stdio(lookup).await
}

async fn run_interactive(cli: &Cli) -> anyhow::Result<()> {
    let lookup = medlookup::cli::build_lookup(cli)?;
    medlookup::cli::interactive::run_stdio(lookup).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Mcp => report(run_mcp(&cli).await),
        Commands::Interactive => report(run_interactive(&cli).await),
        _ => match medlookup::cli::run(cli).await {
            Ok(output) => {
                println!("{output}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                if let Some(lookup_err) = err.downcast_ref::<medlookup::error::MedLookupError>() {
                    eprintln!("Error: {lookup_err}");
                } else {
                    eprintln!("Error: {err}");
                }
                ExitCode::from(1)
            }
        },
    }
}

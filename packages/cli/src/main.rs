mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, init, show, types, ApplyArgs, InitArgs, ShowArgs, TypesArgs};
use tracing_subscriber::EnvFilter;

/// Funnel CLI - build multi-step funnels from the terminal
#[derive(Parser, Debug)]
#[command(name = "funnel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new funnel document
    Init(InitArgs),

    /// Print a document outline
    Show(ShowArgs),

    /// List registered component types
    Types(TypesArgs),

    /// Run a JSON command script against a document
    Apply(ApplyArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Init(args) => init(args, &cwd).await,
            Command::Show(args) => show(args, &cwd).await,
            Command::Types(args) => types(args),
            Command::Apply(args) => apply(args, &cwd).await,
        },
        Err(e) => Err(anyhow::anyhow!("Cannot get current directory: {}", e)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

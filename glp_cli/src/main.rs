use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{path::PathArgs, plan::PlanArgs};

mod config;
mod parsers;
mod path;
mod plan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,

    /// JSON planner parameters (default: $GLP_CONFIG when set)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plans routes for a scenario file
    #[command(visible_alias = "p")]
    Plan {
        #[command(flatten)]
        args: PlanArgs,
    },
    /// Finds a single path on a scenario's grid
    Path {
        #[command(flatten)]
        args: PathArgs,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let params = config::load_params(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan { args } => plan::run(args, params)?,
        Commands::Path { args } => path::run(args, params)?,
    }

    Ok(())
}

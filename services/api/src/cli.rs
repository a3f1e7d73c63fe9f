use crate::report::{run_diagnose, run_rubric_listing, DiagnoseArgs, RubricArgs};
use crate::server;
use ago_diagnosis::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "AGO Diagnosis",
    about = "Diagnose how well web pages are prepared for AI search",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Diagnose a single page and print the report
    Diagnose(DiagnoseArgs),
    /// List the items of the active rubric
    Rubric(RubricArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Rubric CSV to load instead of the configured one
    #[arg(long)]
    pub(crate) rubric: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Diagnose(args) => run_diagnose(args).await,
        Command::Rubric(args) => run_rubric_listing(args),
    }
}

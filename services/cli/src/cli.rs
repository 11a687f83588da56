use crate::demo::{run_demo, run_logout, run_status, DemoArgs};
use crate::infra;
use clap::{Parser, Subcommand};
use license_renewal::config::AppConfig;
use license_renewal::error::AppError;
use license_renewal::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "License Renewal",
    about = "Drive the driver's-license renewal workflow from the command line",
    version
)]
struct Cli {
    /// Override the configured data directory for workflow records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored profile, draft, and submitted processes (default command)
    Status,
    /// Walk a renewal case from draft through payment, vision tests, and verification
    Demo(DemoArgs),
    /// Sign out and delete every stored workflow record
    Logout,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let store = infra::open_store(&config).await;
    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            run_status(&store);
            Ok(())
        }
        Command::Demo(args) => run_demo(&store, &config, args).await,
        Command::Logout => {
            run_logout(&store).await;
            Ok(())
        }
    }
}

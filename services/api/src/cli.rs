use crate::demo::{run_demo, run_eligibility, DemoArgs, EligibilityRunArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fleet_booking::config::AppConfig;
use fleet_booking::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Fleet Booking",
    about = "Run the fleet booking service and its driver eligibility batch from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the operations endpoint and the daily eligibility scheduler (default command)
    Serve(ServeArgs),
    /// Driver eligibility maintenance
    Eligibility {
        #[command(subcommand)]
        command: EligibilityCommand,
    },
    /// Walk a booking and a driver leave through every workflow and print the results
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum EligibilityCommand {
    /// Recompute every driver once and print the batch summary
    Run(EligibilityRunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Do not start the daily eligibility scheduler
    #[arg(long)]
    pub(crate) no_scheduler: bool,
    /// JSON driver export loaded before the scheduler starts (overrides ELIGIBILITY_DRIVERS_JSON)
    #[arg(long)]
    pub(crate) fixtures: Option<PathBuf>,
}

impl ServeArgs {
    /// Command-line flags win over the environment.
    pub(crate) fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_scheduler {
            config.scheduler.enabled = false;
        }
        if let Some(path) = self.fixtures {
            config.scheduler.drivers_json = Some(path);
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Eligibility {
            command: EligibilityCommand::Run(args),
        } => run_eligibility(args),
        Command::Demo(args) => run_demo(args),
    }
}

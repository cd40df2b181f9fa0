use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod notifier;

#[derive(Parser)]
#[command(name = "medminder", version, about = "Medication and appointment reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign up, sign out
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Medicine management
    Med {
        #[command(subcommand)]
        action: commands::med::MedAction,
    },
    /// Appointment management
    Appt {
        #[command(subcommand)]
        action: commands::appt::ApptAction,
    },
    /// Profile and notification settings
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Local alarm registry
    Alarms {
        #[command(subcommand)]
        action: commands::alarms::AlarmsAction,
    },
    /// Restore all alarms from the backend
    Boot(commands::boot::BootArgs),
    /// Smooth ambient light readings into screen brightness
    Brightness(commands::brightness::BrightnessArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MEDMINDER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Med { action } => commands::med::run(action).await,
        Commands::Appt { action } => commands::appt::run(action).await,
        Commands::Profile { action } => commands::profile::run(action).await,
        Commands::Alarms { action } => commands::alarms::run(action),
        Commands::Boot(args) => commands::boot::run(args).await,
        Commands::Brightness(args) => commands::brightness::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

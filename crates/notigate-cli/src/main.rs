use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "notigate", version, about = "Notification admission and scheduling engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Quota, throttle and quiet-hours status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the daily notification limit (clamped to 1-50)
    Limit {
        #[arg(allow_negative_numbers = true)]
        limit: i64,
    },
    /// Set the minimum spacing between notifications
    Interval {
        /// Seconds, capped at one day
        secs: u64,
    },
    /// Quiet hours ("do not disturb")
    Quiet {
        #[command(subcommand)]
        action: commands::quiet::QuietAction,
    },
    /// Show the next best delivery time for a category
    BestTime(commands::best_time::BestTimeArgs),
    /// Try to send one notification now
    Send(commands::send::SendArgs),
    /// Queue notifications from a JSON file and drain once
    Replay {
        /// Path to a JSON array of notifications
        file: std::path::PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action).await,
        Commands::Status { json } => commands::status::run(json).await,
        Commands::Limit { limit } => commands::limits::run_limit(limit).await,
        Commands::Interval { secs } => commands::limits::run_interval(secs).await,
        Commands::Quiet { action } => commands::quiet::run(action).await,
        Commands::BestTime(args) => commands::best_time::run(args),
        Commands::Send(args) => commands::send::run(args).await,
        Commands::Replay { file } => commands::replay::run(&file).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

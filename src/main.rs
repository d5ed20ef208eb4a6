mod cli;

use clap::{Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log file kept next to the working directory across runs.
const LOG_FILE: &str = "affold.log";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity of the program:
    /// -v for info, -vv for debug, and -vvv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Opaque session identifier recorded in the log
    #[arg(long, global = true)]
    session_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a fold_input.json job document from a session file
    Build(cli::build::Args),
    /// Build the job document and run the AlphaFold 3 container
    Run(cli::run::Args),
    /// Render a confidence report from a finished prediction
    Visualize(cli::visualize::Args),
}

fn init_logging(verbosity: u8) {
    let stderr_level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(stderr_level);

    // The log file always records at debug level, independent of -v.
    let file_layer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG)
        });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);
    if let Some(session_id) = &args.session_id {
        info!("Session: {session_id}");
    }

    match &args.command {
        Commands::Build(args) => cli::build::run(args),
        Commands::Run(args) => cli::run::run(args),
        Commands::Visualize(args) => cli::visualize::run(args),
    }
}

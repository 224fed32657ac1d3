use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod session;

use session::GlobalOpts;

#[derive(Parser)]
#[command(name = "timerdeck", version, about = "Timerdeck CLI")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Group management
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// Replay a JSON array of pointer events against a timer
    Gesture {
        /// Timer id
        id: String,
        /// Event file, or "-" for stdin
        file: PathBuf,
    },
    /// Tick timers in the foreground and stream state as JSON lines
    Watch {
        /// Only print timers of this group
        #[arg(long)]
        group: Option<String>,
        /// Keep running after every timer has stopped
        #[arg(long)]
        follow: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Delete every timer and group
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "timerdeck=debug,timerdeck_core=debug"
    } else {
        "timerdeck=info,timerdeck_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.opts.verbose);

    let opts = &cli.opts;
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(opts, action),
        Commands::Group { action } => commands::group::run(opts, action),
        Commands::Gesture { id, file } => commands::gesture::run(opts, &id, &file),
        Commands::Watch { group, follow } => {
            commands::watch::run(opts, group.as_deref(), follow)
        }
        Commands::Config { action } => commands::config::run(opts, action),
        Commands::Clear { yes } => commands::clear::run(opts, yes),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

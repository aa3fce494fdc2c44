use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "eyerest", version, about = "Eyerest work/rest reminder")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    debug: bool,

    /// Also write logs to a daily file under the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder in the foreground, driven by commands on stdin
    Run(commands::run::RunArgs),
    /// Rest statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_dir = if cli.log_file {
        match eyerest_core::storage::data_dir() {
            Ok(dir) => Some(dir.join("logs")),
            Err(e) => {
                eprintln!("warning: file logging disabled: {e}");
                None
            }
        }
    } else {
        None
    };
    let guard = logging::init(cli.debug, log_dir.as_deref());

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        drop(guard);
        std::process::exit(1);
    }
}

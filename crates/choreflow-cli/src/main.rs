use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "choreflow-cli", version, about = "Choreflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit and review task completions
    Completion {
        #[command(subcommand)]
        action: commands::completion::CompletionAction,
    },
    /// Streak calculation and maintenance
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Family holiday exceptions
    Holiday {
        #[command(subcommand)]
        action: commands::holiday::HolidayAction,
    },
    /// Streak change history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Points and allowance totals
    Allowance {
        #[command(subcommand)]
        action: commands::allowance::AllowanceAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHOREFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Completion { action } => commands::completion::run(action),
        Commands::Streak { action } => commands::streak::run(action),
        Commands::Holiday { action } => commands::holiday::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Allowance { action } => commands::allowance::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "choreflow-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        match e.downcast_ref::<choreflow_core::ChoreError>() {
            Some(err) => eprintln!("error[{}]: {err}", err.code()),
            None => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}

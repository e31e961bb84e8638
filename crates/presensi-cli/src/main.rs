use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "presensi-cli", version, about = "Presensi CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in for the day
    Checkin {
        /// Employee id
        #[arg(long)]
        employee: i64,
    },
    /// Check out for the day
    Checkout {
        /// Employee id
        #[arg(long)]
        employee: i64,
    },
    /// Today's attendance status
    Status {
        /// Employee id
        #[arg(long)]
        employee: i64,
    },
    /// Break control
    Break {
        #[command(subcommand)]
        action: commands::breaks::BreakAction,
    },
    /// Employee management
    Employee {
        #[command(subcommand)]
        action: commands::employee::EmployeeAction,
    },
    /// Reports, overview and export
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Checkin { employee } => commands::attend::check_in(employee),
        Commands::Checkout { employee } => commands::attend::check_out(employee),
        Commands::Status { employee } => commands::attend::status(employee),
        Commands::Break { action } => commands::breaks::run(action),
        Commands::Employee { action } => commands::employee::run(action),
        Commands::Report { action } => commands::report::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

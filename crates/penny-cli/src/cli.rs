//! Command-line argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "penny", about = "Personal finance tracker", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server with the background job scheduler
    Serve(ServeArgs),
    /// Run a scheduled job once, immediately
    Jobs(JobsArgs),
    /// Manage users
    User(UserArgs),
    /// Show database and configuration status
    Status,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

#[derive(Args)]
pub struct JobsArgs {
    /// Which job to run
    #[arg(value_enum)]
    pub job: JobKind,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum JobKind {
    /// Process due recurring transactions
    Recurring,
    /// Send last month's summaries
    Reports,
    /// Send budget threshold alerts
    Alerts,
}

#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        email: String,
        name: String,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
    /// List all users
    List,
}

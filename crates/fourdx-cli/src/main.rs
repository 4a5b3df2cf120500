mod cmd;
mod env;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    commit::CommitSubcommand, config::ConfigSubcommand, member::MemberSubcommand,
    session::SessionSubcommand,
};
use env::Env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fourdx",
    about = "Weekly commitments, scoreboard and WIG sessions for a 4DX team",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .fourdx/)
    #[arg(long, global = true, env = "FOURDX_ROOT")]
    root: Option<PathBuf>,

    /// Act as this team member
    #[arg(long = "as", global = true, env = "FOURDX_MEMBER", value_name = "MEMBER_ID")]
    actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .fourdx/ with a default team configuration
    Init {
        /// Wildly Important Goal title for a new configuration
        #[arg(long)]
        title: Option<String>,
    },

    /// Show a week's dates and neighbours
    Week {
        /// current, previous, next or YYYY-Www
        week: Option<String>,
    },

    /// Manage the team roster
    Member {
        #[command(subcommand)]
        subcommand: MemberSubcommand,
    },

    /// Record and update weekly commitments
    Commit {
        #[command(subcommand)]
        subcommand: CommitSubcommand,
    },

    /// Show the scoreboard for a week
    Dashboard {
        /// current, previous, next or YYYY-Www
        week: Option<String>,
    },

    /// Run the weekly WIG session
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Inspect the team configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the HTTP API
    Ui {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Ui { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let env = Env {
        root: root::resolve_root(cli.root.as_deref()),
        actor: cli.actor,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init { title } => cmd::init::run(&env, title.as_deref()),
        Commands::Week { week } => cmd::week::run(&env, week.as_deref()),
        Commands::Member { subcommand } => cmd::member::run(&env, subcommand),
        Commands::Commit { subcommand } => cmd::commit::run(&env, subcommand),
        Commands::Dashboard { week } => cmd::dashboard::run(&env, week.as_deref()),
        Commands::Session { subcommand } => cmd::session::run(&env, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&env, subcommand),
        Commands::Ui { port, no_open } => cmd::ui::run(&env, port, no_open),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

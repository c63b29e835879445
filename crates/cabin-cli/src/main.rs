#![forbid(unsafe_code)]

mod cmd;
mod output;

use cabin_core::config::{Overrides, resolve_config};
use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cabin: renter, staff and admin portal over local fixtures",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Fixture directory or http(s) base URL.
    #[arg(long, global = true)]
    fixtures: Option<String>,

    /// Where local changes and the session are kept.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            json: self.json,
            fixtures: self.fixtures.clone(),
            state_dir: self.state_dir.clone(),
        }
    }

    /// Output mode before any config is read, for errors raised while
    /// loading it.
    fn early_output_mode(&self) -> OutputMode {
        let fallback = if self.json { "json" } else { "text" };
        resolve_output_mode(self.format, fallback)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Everyone",
        about = "Show the dashboard",
        long_about = "Show active notices and outages for the session property, plus open requests for renters.",
        after_help = "EXAMPLES:\n    # Dashboard for the current session\n    cabin home\n\n    # Emit machine-readable output\n    cabin home --json"
    )]
    Home,

    #[command(
        next_help_heading = "Everyone",
        about = "Inspect or switch the acting user",
        after_help = "EXAMPLES:\n    # Start as the demo renter\n    cabin session demo\n\n    # Act as staff\n    cabin session switch --role Staff --user U-2001\n\n    # Who am I?\n    cabin session show"
    )]
    Session(cmd::session::SessionArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Maintenance requests and the staff queue",
        after_help = "EXAMPLES:\n    # Report a leak\n    cabin tickets new --category Plumbing --subcategory Leak -d \"Sink drips\"\n\n    # Staff: take a ticket\n    cabin tickets update T-1001 --assign U-2001 --status Assigned\n\n    # Resolve it\n    cabin tickets update T-1001 --status Resolved"
    )]
    Tickets(cmd::tickets::TicketsArgs),

    #[command(
        next_help_heading = "Community",
        about = "Community board threads and replies",
        after_help = "EXAMPLES:\n    # Read the board\n    cabin threads list\n\n    # Reply\n    cabin threads reply TH-002 --body \"Count me in\"\n\n    # Admin: lock a thread\n    cabin threads lock TH-002"
    )]
    Threads(cmd::threads::ThreadsArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Manage notices",
        after_help = "EXAMPLES:\n    # Post to two properties\n    cabin notices new --title \"Snow plowing\" --starts 2025-01-20T09:00:00Z --ends 2025-01-20T15:00:00Z --property P-001 --property P-002"
    )]
    Notices(cmd::notices::NoticesArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Manage outages",
        after_help = "EXAMPLES:\n    # Announce a water outage\n    cabin outages new --title \"Water main\" --starts 2025-01-20T08:00:00Z --ends 2025-01-20T16:00:00Z --property P-001 --status Active"
    )]
    Outages(cmd::outages::OutagesArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Manage user accounts",
        after_help = "EXAMPLES:\n    # Invite a renter, replacing whoever holds the cabin\n    cabin users new --email new@example.com --name \"New Renter\" --role Renter --property P-001 --cabin C-014 --revoke-conflict"
    )]
    Users(cmd::users::UsersArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Knowledge base for staff",
        after_help = "EXAMPLES:\n    # Articles for the session property\n    cabin kb list"
    )]
    Kb(cmd::kb::KbArgs),

    #[command(
        next_help_heading = "Everyone",
        about = "Discard all local changes",
        long_about = "Drop every locally stored ticket, thread, notice, outage and user change. The fixtures are untouched.",
        after_help = "EXAMPLES:\n    # Start over, keeping the session\n    cabin reset\n\n    # Start over completely\n    cabin reset --session"
    )]
    Reset(cmd::reset::ResetArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CABIN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "cabin=debug,info"
        } else {
            "cabin=info,warn"
        })
    });

    let format = env::var("CABIN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: &mut OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, &cli.overrides())?;
    *output = resolve_output_mode(cli.format, &config.resolved_output);
    debug!(?output, "output mode resolved");

    let portal = cmd::open_portal(&config);
    let output = *output;

    match &cli.command {
        Commands::Home => cmd::home::run_home(&portal, output),
        Commands::Session(args) => cmd::session::run_session(args, &portal, output),
        Commands::Tickets(args) => cmd::tickets::run_tickets(args, &portal, output),
        Commands::Threads(args) => cmd::threads::run_threads(args, &portal, output),
        Commands::Notices(args) => cmd::notices::run_notices(args, &portal, output),
        Commands::Outages(args) => cmd::outages::run_outages(args, &portal, output),
        Commands::Users(args) => cmd::users::run_users(args, &portal, output),
        Commands::Kb(args) => cmd::kb::run_kb(args, &portal, output),
        Commands::Reset(args) => cmd::reset::run_reset(args, &portal, output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mut output = cli.early_output_mode();
    match run(&cli, &mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            if let Err(render_err) = render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} (and rendering failed: {render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

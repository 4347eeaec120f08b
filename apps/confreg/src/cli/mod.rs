//! # confreg CLI Module
//!
//! Operator commands with direct access to the database file.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Create the database and the first admin
//! - `fees` - Print the fee schedule
//! - `quote` - Price a selection
//! - `users` - List, add and re-role back-office users
//! - `registrations` - List registrations by status
//! - `moderate` - Approve or reject registrations
//! - `audit` - Query the audit trail
//! - `stats` - Record counts
//! - `compact` - Reclaim free space in the database file

mod commands;

use clap::{Parser, Subcommand};
use confreg_core::ConfError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// confreg - Conference Back Office
///
/// Registration, moderation, impersonation and audit for an academic
/// conference website.
#[derive(Parser, Debug)]
#[command(name = "confreg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database
    #[arg(short = 'D', long, global = true, default_value = "confreg.db")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Path to confreg.toml (default: ./confreg.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user id (default: the first admin)
    #[arg(long, global = true)]
    pub as_user: Option<u64>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the database and the first admin account
    Init {
        #[arg(long)]
        admin_email: String,

        #[arg(long)]
        admin_name: String,

        /// Initialize even if the database file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print the fee schedule
    Fees,

    /// Price a selection
    Quote {
        /// physical | virtual
        #[arg(short, long)]
        mode: String,

        /// domestic | foreign
        #[arg(short, long)]
        nationality: String,

        /// student | academic | industry | accompanying
        #[arg(short, long)]
        category: String,

        /// Apply the member discount
        #[arg(long)]
        member: bool,
    },

    /// Manage back-office users
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// List registrations
    Registrations {
        /// pending | approved | rejected | all
        #[arg(short, long, default_value = "pending")]
        status: String,
    },

    /// Approve or reject registrations
    Moderate {
        /// Registration ids (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,

        /// approve | reject
        #[arg(short, long)]
        decision: String,

        /// Note for the attendee (required for reject)
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Query the audit trail (newest first)
    Audit {
        /// Only entries by (or impersonated by) this user id
        #[arg(long)]
        actor: Option<u64>,

        /// Dotted action name, e.g. registration.approve
        #[arg(long)]
        action: Option<String>,

        /// Only entries at or after this unix time (seconds)
        #[arg(long)]
        since: Option<u64>,

        /// Maximum entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show record counts
    Stats,

    /// Reclaim free space in the database file (server must be stopped)
    Compact,
}

/// `users` subcommands.
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List accounts
    List,

    /// Add an account
    Add {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// attendee | editor | moderator | admin
        #[arg(long, default_value = "attendee")]
        role: String,
    },

    /// Change an account's role
    SetRole {
        /// User id
        id: u64,

        /// attendee | editor | moderator | admin
        role: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ConfError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        config: cli.config,
        as_user: cli.as_user,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, host, port).await,
        Some(Commands::Init {
            admin_email,
            admin_name,
            force,
        }) => cmd_init(&ctx, &admin_email, &admin_name, force),
        Some(Commands::Fees) => cmd_fees(&ctx),
        Some(Commands::Quote {
            mode,
            nationality,
            category,
            member,
        }) => cmd_quote(&ctx, &mode, &nationality, &category, member),
        Some(Commands::Users { action }) => match action {
            UserCommands::List => cmd_users_list(&ctx),
            UserCommands::Add { email, name, role } => cmd_users_add(&ctx, &email, &name, &role),
            UserCommands::SetRole { id, role } => cmd_users_set_role(&ctx, id, &role),
        },
        Some(Commands::Registrations { status }) => cmd_registrations(&ctx, &status),
        Some(Commands::Moderate {
            ids,
            decision,
            note,
        }) => cmd_moderate(&ctx, &ids, &decision, note.as_deref()),
        Some(Commands::Audit {
            actor,
            action,
            since,
            limit,
        }) => cmd_audit(&ctx, actor, action.as_deref(), since, limit),
        Some(Commands::Compact) => cmd_compact(&ctx),
        Some(Commands::Stats) | None => cmd_stats(&ctx),
    }
}

//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::{api, config::AppConfig, unix_now};
use confreg_core::{
    AuditAction, AuditFilter, BackOffice, ConfError, Decision, FeeSelection, Membership, Money,
    NewUser, Permission, Principal, RegistrationId, RegistrationStatus, Role, StorageBackend,
    Timestamp, UserId,
};
use serde::{Serialize, de::DeserializeOwned};
use std::path::PathBuf;

// =============================================================================
// CONTEXT & HELPERS
// =============================================================================

/// Global flags shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub config: Option<PathBuf>,
    pub as_user: Option<u64>,
    pub json_mode: bool,
}

/// Open the back office named by the global flags.
pub fn load_office(ctx: &Context) -> Result<BackOffice, ConfError> {
    let config = AppConfig::load(ctx.config.as_deref())?;
    open_office(ctx, &config)
}

fn open_office(ctx: &Context, config: &AppConfig) -> Result<BackOffice, ConfError> {
    match ctx.backend.as_str() {
        "redb" => BackOffice::with_redb(&ctx.database, config.policy()),
        "memory" => {
            tracing::warn!("Using the in-memory backend: nothing will be persisted");
            BackOffice::with_backend(StorageBackend::default(), config.policy())
        }
        other => Err(ConfError::Validation(format!(
            "unknown backend '{other}' (expected redb or memory)"
        ))),
    }
}

/// The principal local commands act as.
pub fn operator(ctx: &Context, office: &BackOffice) -> Result<Principal, ConfError> {
    match ctx.as_user {
        Some(id) => office.principal_for(UserId(id)),
        None => office.first_admin(),
    }
}

/// Parse a CLI word into a snake_case serde enum.
pub fn parse_choice<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, ConfError> {
    let word = value.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(word))
        .map_err(|_| ConfError::Validation(format!("invalid {field} '{value}'")))
}

fn parse_role(value: &str) -> Result<Role, ConfError> {
    Role::parse(value).ok_or_else(|| ConfError::Validation(format!("invalid role '{value}'")))
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: &Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), ConfError> {
    let mut config = AppConfig::load(ctx.config.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let office = open_office(ctx, &config)?;

    println!("confreg server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    if office.is_persistent() {
        println!("  Backend:  redb ({:?})", ctx.database);
    } else {
        println!("  Backend:  memory (volatile)");
    }
    let policy = office.policy();
    println!("  Tickets:  {}-NNNNNN", policy.ticket_prefix);
    println!(
        "  Impersonation: {}s default, {}s max",
        policy.impersonation_default_secs, policy.impersonation_max_secs
    );
    println!();
    println!("Public endpoints:");
    println!("  GET  /health           - Health check");
    println!("  GET  /fees             - Fee schedule");
    println!("  POST /fees/quote       - Price a selection");
    println!("  POST /registrations    - Submit a registration");
    println!("  GET  /content/{{slug}}   - Page content");
    println!("  POST /abstracts        - Submit an abstract");
    println!();
    println!("Admin endpoints under /admin (X-User-Id header)");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.bind_addr(), office).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the database and bootstrap the first admin.
pub fn cmd_init(
    ctx: &Context,
    admin_email: &str,
    admin_name: &str,
    force: bool,
) -> Result<(), ConfError> {
    if ctx.backend == "redb" && ctx.database.exists() {
        if !force {
            return Err(ConfError::Conflict(format!(
                "Database {:?} already exists. Use --force to overwrite.",
                ctx.database
            )));
        }
        if !ctx.database.is_file() {
            return Err(ConfError::IoError(format!(
                "{:?} is not a regular file",
                ctx.database
            )));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| ConfError::IoError(format!("Remove {:?}: {}", ctx.database, e)))?;
        tracing::warn!(path = ?ctx.database, "Existing database removed");
    }

    let mut office = load_office(ctx)?;
    let admin = office.bootstrap_admin(admin_email, admin_name, unix_now())?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": ctx.backend,
            "admin": admin,
        }));
    } else {
        println!("Initialized {} database at {:?}", ctx.backend, ctx.database);
        println!("Admin: {} <{}> ({})", admin.display_name, admin.email, admin.id);
    }
    Ok(())
}

// =============================================================================
// FEES COMMANDS
// =============================================================================

/// Print the fee schedule.
pub fn cmd_fees(ctx: &Context) -> Result<(), ConfError> {
    let office = load_office(ctx)?;
    let fees = office.fees();

    if ctx.json_mode {
        print_json(fees);
        return Ok(());
    }

    println!("Fee Schedule");
    println!("============");
    for row in fees.rows() {
        println!(
            "  {:<9} {:<9} {:<13} {}",
            row.mode.as_str(),
            row.nationality.as_str(),
            row.category.as_str(),
            Money::new(row.nationality.currency(), row.amount_minor)
        );
    }
    println!();
    println!(
        "Member discount: {}.{:02}%",
        fees.member_discount_bps() / 100,
        fees.member_discount_bps() % 100
    );
    match fees.early_bird_deadline() {
        Some(deadline) => println!(
            "Early bird:      until {} ({})",
            deadline.secs(),
            if fees.early_bird_open(unix_now()) {
                "open"
            } else {
                "closed"
            }
        ),
        None => println!("Early bird:      none"),
    }
    Ok(())
}

/// Price one selection.
pub fn cmd_quote(
    ctx: &Context,
    mode: &str,
    nationality: &str,
    category: &str,
    member: bool,
) -> Result<(), ConfError> {
    let office = load_office(ctx)?;
    let selection = FeeSelection {
        mode: parse_choice("mode", mode)?,
        nationality: parse_choice("nationality", nationality)?,
        category: parse_choice("category", category)?,
        membership: if member {
            Membership::Member
        } else {
            Membership::NonMember
        },
    };
    let quote = office.quote(&selection, unix_now())?;

    if ctx.json_mode {
        print_json(&quote);
        return Ok(());
    }

    println!("Quote for {}", quote.selection);
    println!("  Base:        {}", quote.base);
    println!("  Early bird: -{}", quote.early_bird_discount);
    println!("  Member:     -{}", quote.member_discount);
    println!("  Total:       {}", quote.total);
    Ok(())
}

// =============================================================================
// USER COMMANDS
// =============================================================================

pub fn cmd_users_list(ctx: &Context) -> Result<(), ConfError> {
    let office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let users = office.list_users(&principal)?;

    if ctx.json_mode {
        print_json(&users);
        return Ok(());
    }

    println!("{} user(s)", users.len());
    for user in users {
        println!(
            "  {:>4}  {:<10} {:<30} {}",
            user.id.0, user.role, user.email, user.display_name
        );
    }
    Ok(())
}

pub fn cmd_users_add(ctx: &Context, email: &str, name: &str, role: &str) -> Result<(), ConfError> {
    let mut office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let user = office.create_user(
        &principal,
        &NewUser::new(email, name, parse_role(role)?),
        unix_now(),
    )?;

    if ctx.json_mode {
        print_json(&user);
    } else {
        println!("Created {} <{}> as {}", user.id, user.email, user.role);
    }
    Ok(())
}

pub fn cmd_users_set_role(ctx: &Context, id: u64, role: &str) -> Result<(), ConfError> {
    let mut office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let user = office.set_role(&principal, UserId(id), parse_role(role)?, unix_now())?;

    if ctx.json_mode {
        print_json(&user);
    } else {
        println!("{} is now {}", user.id, user.role);
    }
    Ok(())
}

// =============================================================================
// REGISTRATION COMMANDS
// =============================================================================

/// List registrations with a status, or all.
pub fn cmd_registrations(ctx: &Context, status: &str) -> Result<(), ConfError> {
    let status = match status.trim() {
        "all" => None,
        s => Some(
            RegistrationStatus::parse(s)
                .ok_or_else(|| ConfError::Validation(format!("invalid status '{s}'")))?,
        ),
    };
    let office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let registrations = office.registrations(&principal, status)?;

    if ctx.json_mode {
        print_json(&registrations);
        return Ok(());
    }

    println!("{} registration(s)", registrations.len());
    for r in registrations {
        println!(
            "  {:>5}  {}  {:<8}  {:<28} {:<30} {}",
            r.id.0,
            r.ticket_code,
            r.status.as_str(),
            r.selection,
            r.attendee.email,
            r.quote.total
        );
    }
    Ok(())
}

/// Apply a moderation decision to a batch.
pub fn cmd_moderate(
    ctx: &Context,
    ids: &[u64],
    decision: &str,
    note: Option<&str>,
) -> Result<(), ConfError> {
    let decision: Decision = parse_choice("decision", decision)?;
    let ids: Vec<RegistrationId> = ids.iter().copied().map(RegistrationId).collect();
    let mut office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let outcomes = office.moderate(&principal, &ids, decision, note, unix_now())?;

    if ctx.json_mode {
        print_json(&outcomes);
        return Ok(());
    }

    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    println!("{applied} of {} applied", outcomes.len());
    for outcome in outcomes {
        println!("  {}", serde_json::to_string(&outcome).unwrap_or_default());
    }
    Ok(())
}

// =============================================================================
// AUDIT & STATS
// =============================================================================

fn audit_filter(
    actor: Option<u64>,
    action: Option<&str>,
    since: Option<u64>,
    limit: Option<usize>,
) -> Result<AuditFilter, ConfError> {
    let action = match action {
        None => None,
        Some(name) => Some(
            AuditAction::parse(name)
                .ok_or_else(|| ConfError::Validation(format!("unknown action '{name}'")))?,
        ),
    };
    Ok(AuditFilter {
        actor: actor.map(UserId),
        action,
        since: since.map(Timestamp),
        limit,
    })
}

pub fn cmd_audit(
    ctx: &Context,
    actor: Option<u64>,
    action: Option<&str>,
    since: Option<u64>,
    limit: Option<usize>,
) -> Result<(), ConfError> {
    let filter = audit_filter(actor, action, since, limit)?;
    let office = load_office(ctx)?;
    let principal = operator(ctx, &office)?;
    let entries = office.audit_log(&principal, &filter)?;

    if ctx.json_mode {
        print_json(&entries);
        return Ok(());
    }

    for e in entries {
        let actor = match (e.actor, e.impersonator) {
            (Some(a), Some(admin)) => format!("{a} (via {admin})"),
            (Some(a), None) => a.to_string(),
            (None, _) => "public".to_string(),
        };
        println!(
            "#{:<6} {:>10}  {:<22} {:<24} {:<20} {}",
            e.seq.0,
            e.at.secs(),
            e.action.as_str(),
            actor,
            e.target,
            e.detail
        );
    }
    Ok(())
}

/// Compact the database file. Needs exclusive access, so stop the server first.
pub fn cmd_compact(ctx: &Context) -> Result<(), ConfError> {
    let mut office = load_office(ctx)?;
    if !office.is_persistent() {
        return Err(ConfError::Validation(
            "compaction needs the redb backend".to_string(),
        ));
    }
    operator(ctx, &office)?.require(Permission::ManageRoles)?;

    let before = file_len(&ctx.database);
    let compacted = office.compact()?;
    drop(office);
    let after = file_len(&ctx.database);
    tracing::info!(path = ?ctx.database, before, after, compacted, "Database compacted");

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "compacted": compacted,
            "bytes_before": before,
            "bytes_after": after,
        }));
    } else if compacted {
        println!("Compacted {:?}: {before} -> {after} bytes", ctx.database);
    } else {
        println!("{:?} is already compact ({after} bytes)", ctx.database);
    }
    Ok(())
}

fn file_len(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

pub fn cmd_stats(ctx: &Context) -> Result<(), ConfError> {
    let office = load_office(ctx)?;
    let stats = office.stats()?;

    if ctx.json_mode {
        print_json(&stats);
        return Ok(());
    }

    println!("confreg Status");
    println!("==============");
    println!("Database:      {:?}", ctx.database);
    println!("Backend:       {}", ctx.backend);
    println!();
    println!("Users:         {}", stats.users);
    println!("Pending:       {}", stats.registrations_pending);
    println!("Approved:      {}", stats.registrations_approved);
    println!("Rejected:      {}", stats.registrations_rejected);
    println!("Abstracts:     {}", stats.abstracts);
    println!("Pages:         {}", stats.pages);
    println!("Audit entries: {}", stats.audit_entries);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

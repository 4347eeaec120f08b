//! # confreg - Conference Back Office
//!
//! The main binary for the conference registration back office.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for operators
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     apps/confreg (THE BINARY)                   │
//! │                                                                 │
//! │        ┌─────────────┐              ┌─────────────┐             │
//! │        │   CLI       │              │   HTTP API  │             │
//! │        │  (clap)     │              │   (axum)    │             │
//! │        └──────┬──────┘              └──────┬──────┘             │
//! │               │                            │                    │
//! │               └─────────────┬──────────────┘                    │
//! │                             ▼                                   │
//! │                    ┌────────────────┐                           │
//! │                    │  confreg-core  │                           │
//! │                    │  (THE LOGIC)   │                           │
//! │                    └────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Create the database and the first admin
//! confreg init --admin-email chair@conf.org --admin-name "Program Chair"
//!
//! # Start the HTTP server
//! confreg server --host 0.0.0.0 --port 8080
//!
//! # Operator commands
//! confreg registrations --status pending
//! confreg moderate --ids 1,2,3 --decision approve
//! confreg audit --limit 20
//! ```

use clap::Parser;
use confreg::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CONFREG_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CONFREG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "confreg=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ┌──────────────────────────────────────┐
  │  confreg · Conference Back Office    │
  └──────────────────────────────────────┘
  v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

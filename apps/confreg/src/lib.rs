//! # confreg
//!
//! Server and operator tooling for the conference back office.
//!
//! - `api`: axum HTTP API for the public site and the admin panel
//! - `cli`: clap commands for operators with local database access
//! - `config`: `confreg.toml` loading

pub mod api;
pub mod cli;
pub mod config;

use confreg_core::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as seen by the rules engine.
///
/// A clock set before 1970 reads as the epoch.
pub fn unix_now() -> Timestamp {
    Timestamp(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
}

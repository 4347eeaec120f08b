//! # Configuration
//!
//! Optional `confreg.toml`:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [registration]
//! ticket_prefix = "ICX26"
//!
//! [impersonation]
//! default_secs = 900
//! max_secs = 3600
//!
//! [fees]
//! member_discount_bps = 1000
//! early_bird_discount_bps = 1500
//! early_bird_deadline = 1767225600
//!
//! [[fees.rows]]
//! mode = "physical"
//! nationality = "domestic"
//! category = "student"
//! amount_minor = 300000
//! ```
//!
//! Every section is optional. A missing `[fees]` keeps the built-in schedule;
//! a present one replaces it entirely.

use confreg_core::{ConfError, FeeSchedule, OfficePolicy};
use confreg_core::primitives::{
    DEFAULT_IMPERSONATION_SECS, DEFAULT_TICKET_PREFIX, MAX_IMPERSONATION_SECS,
};
use serde::Deserialize;
use std::path::Path;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "confreg.toml";

/// Config files larger than this are refused (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrationConfig {
    pub ticket_prefix: String,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            ticket_prefix: DEFAULT_TICKET_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImpersonationConfig {
    pub default_secs: u64,
    pub max_secs: u64,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            default_secs: DEFAULT_IMPERSONATION_SECS,
            max_secs: MAX_IMPERSONATION_SECS,
        }
    }
}

/// Parsed `confreg.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registration: RegistrationConfig,
    pub impersonation: ImpersonationConfig,
    pub fees: Option<FeeSchedule>,
}

impl AppConfig {
    /// Parse TOML text and validate the resulting policy.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ConfError::SerializationError(format!("Invalid config: {}", e)))?;
        config.policy().validate()?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `confreg.toml` in the working
    /// directory is used when present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfError> {
        let path = match path {
            Some(p) => p,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            ConfError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfError::IoError(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Operator policy for the rules engine.
    pub fn policy(&self) -> OfficePolicy {
        OfficePolicy {
            fees: self.fees.clone().unwrap_or_default(),
            ticket_prefix: self.registration.ticket_prefix.clone(),
            impersonation_default_secs: self.impersonation.default_secs,
            impersonation_max_secs: self.impersonation.max_secs,
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================

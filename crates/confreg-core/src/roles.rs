//! # Roles and Permissions
//!
//! Back-office users carry exactly one `Role`. Operations ask for a
//! `Permission`; the role matrix decides.
//!
//! | permission              | Attendee | Editor | Moderator | Admin |
//! |-------------------------|----------|--------|-----------|-------|
//! | EditContent             |          | x      |           | x     |
//! | ViewRegistrations       |          |        | x         | x     |
//! | ModerateRegistrations   |          |        | x         | x     |
//! | ReviewAbstracts         |          |        | x         | x     |
//! | ViewAudit               |          |        |           | x     |
//! | ManageRoles             |          |        |           | x     |
//! | Impersonate             |          |        |           | x     |
//!
//! While impersonating, `ManageRoles` and `Impersonate` are never granted,
//! whatever the target's role.

use crate::primitives::MAX_NAME_LENGTH;
use crate::validation;
use crate::{ConfError, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Back-office role, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attendee,
    Editor,
    Moderator,
    Admin,
}

/// A guarded capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    EditContent,
    ViewRegistrations,
    ModerateRegistrations,
    ReviewAbstracts,
    ViewAudit,
    ManageRoles,
    Impersonate,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attendee => "attendee",
            Self::Editor => "editor",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attendee" => Some(Self::Attendee),
            "editor" => Some(Self::Editor),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// The role matrix.
    #[must_use]
    pub fn allows(self, permission: Permission) -> bool {
        match self {
            Self::Admin => true,
            Self::Moderator => matches!(
                permission,
                Permission::ViewRegistrations
                    | Permission::ModerateRegistrations
                    | Permission::ReviewAbstracts
            ),
            Self::Editor => permission == Permission::EditContent,
            Self::Attendee => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EditContent => "edit_content",
            Self::ViewRegistrations => "view_registrations",
            Self::ModerateRegistrations => "moderate_registrations",
            Self::ReviewAbstracts => "review_abstracts",
            Self::ViewAudit => "view_audit",
            Self::ManageRoles => "manage_roles",
            Self::Impersonate => "impersonate",
        };
        f.write_str(name)
    }
}

// =============================================================================
// USERS
// =============================================================================

/// A back-office account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: Timestamp,
}

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Attendee
}

impl NewUser {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            role,
        }
    }

    /// Normalize email and name.
    pub fn normalized(&self) -> Result<Self, ConfError> {
        Ok(Self {
            email: validation::email(&self.email)?,
            display_name: validation::required_text(
                "display_name",
                &self.display_name,
                MAX_NAME_LENGTH,
            )?,
            role: self.role,
        })
    }
}

// =============================================================================
// PRINCIPAL
// =============================================================================

/// The resolved caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user the caller acts as.
    pub user: UserId,
    /// Role of `user`.
    pub role: Role,
    /// The admin behind an impersonation session, if any.
    pub impersonator: Option<UserId>,
}

impl Principal {
    /// A caller acting as themselves.
    #[must_use]
    pub fn direct(user: &User) -> Self {
        Self {
            user: user.id,
            role: user.role,
            impersonator: None,
        }
    }

    #[must_use]
    pub fn is_impersonating(&self) -> bool {
        self.impersonator.is_some()
    }

    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        if self.is_impersonating()
            && matches!(permission, Permission::ManageRoles | Permission::Impersonate)
        {
            return false;
        }
        self.role.allows(permission)
    }

    /// Fail with `Forbidden` unless the permission is held.
    pub fn require(&self, permission: Permission) -> Result<(), ConfError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(ConfError::Forbidden(format!(
                "{} ({}) lacks {}",
                self.user, self.role, permission
            )))
        }
    }
}

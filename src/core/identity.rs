//! Verified session identity as seen by the booking core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::gender::GenderBucket;
use crate::util::serde::UserId;

/// Application roles carried by the identity credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Gym administrator.
    #[serde(rename = "admin")]
    Admin,
    /// Trainer.
    #[serde(rename = "entrenador")]
    Trainer,
    /// Gym member; the only role that books classes.
    #[serde(rename = "cliente")]
    Client,
    /// Registered but not yet approved.
    #[serde(rename = "pendiente")]
    Pending,
}

impl Role {
    /// Canonical role name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Trainer => "entrenador",
            Self::Client => "cliente",
            Self::Pending => "pendiente",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "entrenador" => Ok(Self::Trainer),
            "cliente" => Ok(Self::Client),
            "pendiente" => Ok(Self::Pending),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Identity established before a request reaches the booking core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Authenticated user.
    pub user_id: UserId,
    /// Role, when the credential carries a recognised one.
    pub role: Option<Role>,
    /// Display name.
    pub name: Option<String>,
    /// Normalised gender; `None` when unclassifiable.
    pub gender: Option<GenderBucket>,
}

impl SessionIdentity {
    /// Identity with a user id and gender only.
    pub const fn new(user_id: UserId, gender: Option<GenderBucket>) -> Self {
        Self {
            user_id,
            role: None,
            name: None,
            gender,
        }
    }

    /// Attach a role.
    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Whether the identity carries `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}

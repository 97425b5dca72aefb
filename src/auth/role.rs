use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Administrador,
    Vendedor,
    Usuario,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrador, Role::Vendedor, Role::Usuario];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "Administrador",
            Role::Vendedor => "Vendedor",
            Role::Usuario => "Usuario",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Administrador
    }

    /// Vendedor or Administrador.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Administrador | Role::Vendedor)
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
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Rol inválido. Roles válidos: {}",
                    Role::ALL.map(|r| r.as_str()).join(", ")
                )
            })
    }
}

/// The role recorded against an activity entry: a user's role, or the
/// sentinel for anonymous and system-originated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    User(Role),
    System,
}

impl ActorRole {
    pub const SYSTEM: &'static str = "Sistema";

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::User(role) => role.as_str(),
            ActorRole::System => Self::SYSTEM,
        }
    }
}

impl From<Role> for ActorRole {
    fn from(role: Role) -> Self {
        ActorRole::User(role)
    }
}

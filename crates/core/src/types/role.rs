//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known [`Role`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected 'buyer' or 'admin')")]
pub struct RoleParseError(pub String);

/// Authorization role of a user.
///
/// Catalog mutation requires [`Role::Admin`]; everyone registers as a buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer; may browse and manage their own session.
    #[default]
    Buyer,
    /// May create, update and delete products and categories.
    Admin,
}

impl Role {
    /// Whether this role may mutate the catalog.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The wire/database name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_buyer() {
        assert_eq!(Role::default(), Role::Buyer);
        assert!(!Role::Buyer.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Buyer ".parse::<Role>().unwrap(), Role::Buyer);
        assert!("super_admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let parsed: Role = serde_json::from_str("\"buyer\"").unwrap();
        assert_eq!(parsed, Role::Buyer);
    }
}

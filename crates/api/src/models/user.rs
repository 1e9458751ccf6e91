//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Email, HashedPassword, Role, UserId};

/// A registered user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display handle, unique across users.
    pub username: String,
    /// Login identifier, unique across users.
    pub email: Email,
    /// Argon2id hash of the user's password.
    pub password_hash: HashedPassword,
    /// Authorization role, re-read on every admin request.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: HashedPassword,
    pub role: Role,
}

/// The profile returned to clients. Never includes the password hash.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(7),
            username: "jane".to_string(),
            email: Email::parse("jane@example.com").unwrap(),
            password_hash: HashedPassword::from_phc("$argon2id$v=19$opaque".to_string()),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["username"], "jane");
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
    }
}

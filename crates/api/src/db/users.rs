//! User repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{Email, HashedPassword, Role, UserId};

use super::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

/// Unique constraint on `users.username`, as named by the migration.
const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            password_hash: HashedPassword::from_phc(row.password_hash),
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password_hash.as_phc())
            .bind(user.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    let field = if db_err.constraint() == Some(USERNAME_CONSTRAINT) {
                        "username"
                    } else {
                        "email"
                    };
                    return RepositoryError::Conflict(field.to_owned());
                }
                RepositoryError::Database(e)
            })?;

        let created = User::try_from(row)?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(role)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let updated = User::try_from(row)?;
        tx.commit().await?;
        Ok(updated)
    }
}

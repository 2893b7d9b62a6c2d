/// User model and database operations
///
/// Every account has a role that decides which dashboards it may reach and
/// a status that admins flip to archive (soft-delete) an account.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(20) NOT NULL DEFAULT 'buyer',
///     status VARCHAR(20) NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use storefront_shared::models::user::{CreateUser, Role, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Buyer,
/// })
/// .await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;

use super::UnknownVariant;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses the catalog, keeps a cart, places orders
    Buyer,

    /// Everything a buyer can do, plus listing products and fulfilling orders
    Seller,

    /// Reviews seller requests and moderates accounts
    Admin,
}

impl Role {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Parses role from its stored form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buyer" => Some(Role::Buyer),
            "seller" => Some(Role::Seller),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Path a freshly logged-in user of this role lands on
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Seller => "/seller_dashboard",
            Role::Buyer => "/buyer_dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| UnknownVariant::new("role", value))
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Archived,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Archived => "archived",
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(UserStatus::Active),
            "archived" => Ok(UserStatus::Archived),
            _ => Err(UnknownVariant::new("user status", value)),
        }
    }
}

/// User account
///
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Display name, unique across all users
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Current role
    #[sqlx(try_from = "String")]
    pub role: Role,

    /// Active or archived
    #[sqlx(try_from = "String")]
    pub status: UserStatus,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Archived accounts can neither log in nor use an existing session
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Hash, never the plaintext password
    pub password_hash: String,

    pub role: Role,
}

/// Which unique field an attempted signup or profile edit collides with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityConflict {
    Name,
    Email,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, created_at";

impl User {
    /// Creates a new active user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation (`users_name_key` / `users_email_key`)
    /// when the name or email is already taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role.as_str())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Reports whether `name` or `email` already belongs to another account
    ///
    /// `exclude_id` skips the caller's own row when editing a profile.
    /// A name clash is reported before an email clash.
    pub async fn find_identity_conflict(
        pool: &PgPool,
        name: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<IdentityConflict>, sqlx::Error> {
        let row: Option<(bool, bool)> = sqlx::query_as(
            r#"
            SELECT BOOL_OR(name = $1), BOOL_OR(email = $2)
            FROM users
            WHERE (name = $1 OR email = $2)
              AND ($3::BIGINT IS NULL OR id <> $3)
            HAVING COUNT(*) > 0
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(exclude_id)
        .fetch_optional(pool)
        .await?;

        Ok(match row {
            Some((true, _)) => Some(IdentityConflict::Name),
            Some((_, true)) => Some(IdentityConflict::Email),
            _ => None,
        })
    }

    /// Every stored password hash, for the signup password-reuse check
    pub async fn all_password_hashes(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT password_hash FROM users")
            .fetch_all(pool)
            .await
    }

    /// Lists every account for the admin dashboard, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Replaces name and email
    ///
    /// Returns the updated user, or `None` if the user doesn't exist.
    pub async fn update_profile(
        conn: &mut PgConnection,
        id: i64,
        name: &str,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET name = $2, email = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(conn)
        .await
    }

    /// Stores a new password hash
    pub async fn update_password(
        conn: &mut PgConnection,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Archives or reactivates an account
    ///
    /// Returns false if the user doesn't exist or already had that status.
    pub async fn set_status(
        pool: &PgPool,
        id: i64,
        status: UserStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1 AND status <> $2")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Changes a user's role
    ///
    /// Takes a connection so seller approval can run it inside the same
    /// transaction as the request update.
    pub async fn set_role(conn: &mut PgConnection, id: i64, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Shipping address model
///
/// Addresses belong to one user. Every query filters by `user_id` so a user
/// can only see, use or delete their own rows.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,

    /// Recipient name
    pub name: String,

    pub address: String,
    pub phone: String,
}

/// Input for creating an address
#[derive(Debug, Clone)]
pub struct CreateAddress {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl Address {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        data: CreateAddress,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (user_id, name, address, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, address, phone
            "#,
        )
        .bind(user_id)
        .bind(data.name)
        .bind(data.address)
        .bind(data.phone)
        .fetch_one(pool)
        .await
    }

    /// Lists a user's addresses in creation order
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Address>(
            "SELECT id, user_id, name, address, phone FROM addresses WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Checks that `address_id` exists and belongs to `user_id`
    ///
    /// Runs on the caller's connection so order placement can verify the
    /// address inside its transaction.
    pub async fn is_owned_by(
        conn: &mut PgConnection,
        address_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM addresses WHERE id = $1 AND user_id = $2)",
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
    }

    /// Deletes one of the user's addresses
    ///
    /// Returns false when no such address belongs to the user.
    ///
    /// # Errors
    ///
    /// A foreign-key violation when an order still references the address.
    pub async fn delete(pool: &PgPool, address_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(address_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

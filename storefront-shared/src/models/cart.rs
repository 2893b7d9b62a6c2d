/// Cart line model
///
/// A user holds at most one line per product (`UNIQUE (user_id, product_id)`);
/// adding a product that is already in the cart increments its quantity.
/// Priced views of the cart are built by `workflow::cart`.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Most units of one product a cart line may hold
pub const MAX_LINE_QUANTITY: i32 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,

    /// Always at least 1
    pub quantity: i32,
}

impl CartItem {
    /// Adds `quantity` of a product to the user's cart
    ///
    /// Returns `None` if the product doesn't exist or is archived. A merged
    /// line is capped at [`MAX_LINE_QUANTITY`].
    pub async fn add(
        pool: &PgPool,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            SELECT $1, p.id, $3 FROM products p
            WHERE p.id = $2 AND p.is_archive = FALSE
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity =
                LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, $4)::INTEGER
            RETURNING id, user_id, product_id, quantity
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(MAX_LINE_QUANTITY)
        .fetch_optional(pool)
        .await
    }

    /// Sets the quantity of an existing line
    ///
    /// Returns false when the product isn't in the user's cart.
    pub async fn update_quantity(
        pool: &PgPool,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a product from the user's cart
    pub async fn remove(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unpriced lines for a user
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(
            "SELECT id, user_id, product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

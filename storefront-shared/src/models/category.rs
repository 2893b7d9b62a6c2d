/// Product category model
///
/// Categories are a flat list shared by all sellers. Any signed-in user may
/// create one, and a seller can create one inline while adding a product.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    /// Inserts a category
    ///
    /// # Errors
    ///
    /// Unique violation on `categories_name_key` when the name exists.
    pub async fn create(conn: &mut PgConnection, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(conn)
        .await
    }

    /// All categories, alphabetical
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name, id")
            .fetch_all(pool)
            .await
    }
}

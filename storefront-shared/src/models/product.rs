/// Product model and database operations
///
/// Products are owned by the seller that listed them. Archiving hides a
/// product from the catalog and from add-to-cart without deleting it, so
/// historical order items keep a valid reference.
///
/// # Example
///
/// ```no_run
/// use storefront_shared::models::product::{CatalogFilter, Product};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = CatalogFilter {
///     category_id: None,
///     query: Some("notebook".to_string()),
/// };
/// let products = Product::list_catalog(&pool, &filter).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,

    /// Seller who listed the product
    pub user_id: i64,

    pub category_id: Option<i64>,
    pub product_name: String,
    pub size: String,
    pub pages: i32,

    /// Informational only, never decremented by checkout
    pub stock: i32,

    /// Current unit price in cents
    pub price_cents: i64,

    /// Filename inside the upload directory
    pub image_path: Option<String>,

    pub is_archive: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for listing a new product
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub category_id: Option<i64>,
    pub product_name: String,
    pub size: String,
    pub pages: i32,
    pub stock: i32,
    pub price_cents: i64,
    pub image_path: Option<String>,
}

/// Editable product fields
#[derive(Debug, Clone)]
pub struct UpdateProduct {
    pub product_name: String,
    pub size: String,
    pub pages: i32,
    pub stock: i32,
    pub price_cents: i64,
}

/// Buyer catalog filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    /// Restrict to one category; `None` means all
    pub category_id: Option<i64>,

    /// Case-insensitive substring match on name or size
    pub query: Option<String>,
}

impl CatalogFilter {
    fn pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const PRODUCT_COLUMNS: &str = "id, user_id, category_id, product_name, size, pages, stock, \
                               price_cents, image_path, is_archive, created_at";

impl Product {
    /// Lists a product for `seller_id`
    ///
    /// Takes a connection because the add-product handler may create the
    /// category in the same transaction.
    pub async fn create(
        conn: &mut PgConnection,
        seller_id: i64,
        data: CreateProduct,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (user_id, category_id, product_name, size, pages, stock, price_cents, image_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(seller_id)
        .bind(data.category_id)
        .bind(data.product_name)
        .bind(data.size)
        .bind(data.pages)
        .bind(data.stock)
        .bind(data.price_cents)
        .bind(data.image_path)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a product only if `seller_id` owns it
    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        seller_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(seller_id)
        .fetch_optional(pool)
        .await
    }

    /// Updates an owned product
    ///
    /// Returns `None` when the product doesn't exist or belongs to another
    /// seller.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        seller_id: i64,
        data: UpdateProduct,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET product_name = $3, size = $4, pages = $5, stock = $6, price_cents = $7
            WHERE id = $1 AND user_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(seller_id)
        .bind(data.product_name)
        .bind(data.size)
        .bind(data.pages)
        .bind(data.stock)
        .bind(data.price_cents)
        .fetch_optional(pool)
        .await
    }

    /// Sets the archive flag on an owned product
    pub async fn set_archived(
        pool: &PgPool,
        id: i64,
        seller_id: i64,
        archived: bool,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE products SET is_archive = $3 WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(seller_id)
                .bind(archived)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Non-archived products matching the buyer's filter
    pub async fn list_catalog(
        pool: &PgPool,
        filter: &CatalogFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_archive = FALSE
              AND ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::TEXT IS NULL OR product_name ILIKE $2 OR size ILIKE $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.category_id)
        .bind(filter.pattern())
        .fetch_all(pool)
        .await
    }

    /// Every product a seller listed, archived ones included
    pub async fn list_by_seller(pool: &PgPool, seller_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(seller_id)
        .fetch_all(pool)
        .await
    }
}

/// Cart aggregation
///
/// Joins a user's cart lines with current product prices and totals them.
/// The same aggregation backs the cart page, both checkout views and, in
/// locking form, order placement.
///
/// # Example
///
/// ```no_run
/// use storefront_shared::workflow::cart::{CartSelection, CartSummary};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), storefront_shared::workflow::WorkflowError> {
/// let whole = CartSummary::for_user(&pool, 1, None).await?;
///
/// let selection = CartSelection::parse(Some("[3, 5]"))?;
/// let picked = selection.for_checkout(&pool, 1).await?;
/// assert!(picked.total_cents <= whole.total_cents);
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::{Result, WorkflowError};
use crate::models::cart::{CartItem, MAX_LINE_QUANTITY};

/// One cart line priced at the product's current price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: i64,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: i32,
    pub line_total_cents: i64,
}

/// Priced lines and their grand total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
}

impl CartSummary {
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let total_cents = lines.iter().map(|l| l.line_total_cents).sum();
        Self { lines, total_cents }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Prices the user's cart
    ///
    /// With `selection = None` every line participates; otherwise only
    /// lines whose product id is in `selection`. Lines for archived
    /// products are left out.
    pub async fn for_user(
        pool: &PgPool,
        user_id: i64,
        selection: Option<&[i64]>,
    ) -> std::result::Result<Self, sqlx::Error> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.product_id, p.product_name, p.price_cents, c.quantity,
                   c.quantity::BIGINT * p.price_cents AS line_total_cents
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
              AND p.is_archive = FALSE
              AND ($2::BIGINT[] IS NULL OR c.product_id = ANY($2))
            ORDER BY c.id
            "#,
        )
        .bind(user_id)
        .bind(selection)
        .fetch_all(pool)
        .await?;

        Ok(Self::from_lines(lines))
    }
}

impl CartLine {
    /// Reads the selected lines and locks their cart rows until the
    /// transaction ends
    ///
    /// A second checkout of the same lines blocks here and, once the first
    /// commits, finds them gone.
    pub async fn lock_selected(
        conn: &mut PgConnection,
        user_id: i64,
        product_ids: &[i64],
    ) -> std::result::Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.product_id, p.product_name, p.price_cents, c.quantity,
                   c.quantity::BIGINT * p.price_cents AS line_total_cents
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
              AND p.is_archive = FALSE
              AND c.product_id = ANY($2)
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(user_id)
        .bind(product_ids)
        .fetch_all(conn)
        .await
    }

    /// Deletes exactly the given cart rows
    pub async fn consume(
        conn: &mut PgConnection,
        user_id: i64,
        product_ids: &[i64],
    ) -> std::result::Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
                .bind(user_id)
                .bind(product_ids)
                .execute(conn)
                .await?;

        Ok(result.rows_affected())
    }
}

/// Non-empty set of product ids picked at checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSelection(Vec<i64>);

impl CartSelection {
    /// Rejects an empty selection; duplicates are dropped
    pub fn new(mut product_ids: Vec<i64>) -> Result<Self> {
        product_ids.sort_unstable();
        product_ids.dedup();

        if product_ids.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }

        Ok(Self(product_ids))
    }

    /// Parses the `selected_items` form field, a JSON array of product ids
    ///
    /// A missing, blank or unparsable field counts as an empty selection.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let ids = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str::<Vec<i64>>(s).ok())
            .unwrap_or_default();

        Self::new(ids)
    }

    pub fn product_ids(&self) -> &[i64] {
        &self.0
    }

    /// Prices the selected lines for the checkout page
    ///
    /// # Errors
    ///
    /// `EmptySelection` when none of the selected products is in the cart.
    pub async fn for_checkout(&self, pool: &PgPool, user_id: i64) -> Result<CartSummary> {
        let summary = CartSummary::for_user(pool, user_id, Some(self.product_ids())).await?;

        if summary.is_empty() {
            debug!(user_id, "Checkout selection matched no cart lines");
            return Err(WorkflowError::EmptySelection);
        }

        Ok(summary)
    }
}

fn check_quantity(quantity: i32) -> Result<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(WorkflowError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// Adds a product to the cart, merging with an existing line
///
/// # Errors
///
/// `NotFound` for unknown or archived products, `InvalidQuantity` for
/// quantities below 1 or above [`MAX_LINE_QUANTITY`]. Merging into an
/// existing line stops at the cap.
pub async fn add_item(pool: &PgPool, user_id: i64, product_id: i64, quantity: i32) -> Result<CartItem> {
    check_quantity(quantity)?;

    CartItem::add(pool, user_id, product_id, quantity)
        .await?
        .ok_or(WorkflowError::NotFound("Product"))
}

/// Sets the quantity of a line already in the cart
pub async fn set_quantity(pool: &PgPool, user_id: i64, product_id: i64, quantity: i32) -> Result<()> {
    check_quantity(quantity)?;

    if !CartItem::update_quantity(pool, user_id, product_id, quantity).await? {
        return Err(WorkflowError::NotFound("Cart item"));
    }
    Ok(())
}

pub async fn remove_item(pool: &PgPool, user_id: i64, product_id: i64) -> Result<()> {
    if !CartItem::remove(pool, user_id, product_id).await? {
        return Err(WorkflowError::NotFound("Cart item"));
    }
    Ok(())
}

/// Order and order item models
///
/// An order is created once, atomically, at checkout (see
/// `workflow::placement`) and afterwards only changes status. Each order
/// item carries the unit price captured at purchase time and a
/// `seller_status` owned by the seller of that item's product. The
/// order-level `status` is a rollup of the item statuses (see
/// `workflow::fulfillment`), except for `Cancelled`, which the buyer sets
/// directly.
///
/// # Status transitions
///
/// ```text
/// Pending ──▶ Shipped ──▶ Delivered
///    │           │
///    └───────────┴──▶ Cancelled
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::fmt;

use super::UnknownVariant;

/// Fulfillment status, shared by orders and order items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Shipped" => Some(OrderStatus::Shipped),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Delivered and Cancelled orders never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Checks if an order may move from this status to `target`
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        match (self, target) {
            (OrderStatus::Pending, OrderStatus::Shipped) => true,
            (OrderStatus::Shipped, OrderStatus::Delivered) => true,

            // Buyer cancellation
            (OrderStatus::Pending, OrderStatus::Cancelled) => true,
            (OrderStatus::Shipped, OrderStatus::Cancelled) => true,

            _ => false,
        }
    }

    /// Statuses a seller may put on their own order items
    pub fn is_seller_settable(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// All variants, in lifecycle order
    pub fn all() -> [OrderStatus; 4] {
        [
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OrderStatus::parse(&value).ok_or_else(|| UnknownVariant::new("order status", value))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,

    /// Buyer
    pub user_id: i64,

    pub address_id: i64,
    pub payment_method: String,

    #[sqlx(try_from = "String")]
    pub status: OrderStatus,

    /// Sum of quantity × captured unit price over all items
    pub total_amount_cents: i64,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,

    /// Unit price at the moment the order was placed
    pub price_cents: i64,

    #[sqlx(try_from = "String")]
    pub seller_status: OrderStatus,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i64 {
        i64::from(self.quantity) * self.price_cents
    }
}

const ORDER_COLUMNS: &str =
    "id, user_id, address_id, payment_method, status, total_amount_cents, created_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_cents, seller_status";

impl Order {
    /// Inserts a Pending order with a zero total
    ///
    /// Only called inside the placement transaction, which sets the real
    /// total once every item is written.
    pub async fn insert_pending(
        conn: &mut PgConnection,
        user_id: i64,
        address_id: i64,
        payment_method: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, address_id, payment_method, status, total_amount_cents)
            VALUES ($1, $2, $3, 'Pending', 0)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(address_id)
        .bind(payment_method)
        .fetch_one(conn)
        .await
    }

    pub async fn set_total(
        conn: &mut PgConnection,
        order_id: i64,
        total_amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET total_amount_cents = $2 WHERE id = $1")
            .bind(order_id)
            .bind(total_amount_cents)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Locks the order row for the rest of the transaction and returns it
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Writes a new status, unconditionally
    ///
    /// Callers hold the row lock from [`Order::lock`] and have already
    /// checked the transition.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: i64,
        status: OrderStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Orders placed by a buyer, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn items(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItem>, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(pool)
        .await
    }

    /// Item statuses for an order, read on the caller's connection
    pub async fn item_statuses(
        conn: &mut PgConnection,
        order_id: i64,
    ) -> Result<Vec<OrderStatus>, sqlx::Error> {
        let raw: Vec<String> =
            sqlx::query_scalar("SELECT seller_status FROM order_items WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(conn)
                .await?;

        raw.into_iter()
            .map(|s| OrderStatus::try_from(s).map_err(|e| sqlx::Error::Decode(Box::new(e))))
            .collect()
    }
}

impl OrderItem {
    /// Records one purchased line inside the placement transaction
    pub async fn insert(
        conn: &mut PgConnection,
        order_id: i64,
        product_id: i64,
        quantity: i32,
        price_cents: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_cents, seller_status)
            VALUES ($1, $2, $3, $4, 'Pending')
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price_cents)
        .fetch_one(conn)
        .await
    }

    /// Status of the order if `seller_id` sells at least one of its items
    ///
    /// Takes a share lock on the order row so a concurrent cancel waits for
    /// the caller's transaction.
    pub async fn order_status_for_seller(
        conn: &mut PgConnection,
        order_id: i64,
        seller_id: i64,
    ) -> Result<Option<OrderStatus>, sqlx::Error> {
        let raw: Option<String> = sqlx::query_scalar(
            r#"
            SELECT o.status FROM orders o
            WHERE o.id = $1
              AND EXISTS (
                  SELECT 1 FROM order_items oi
                  JOIN products p ON p.id = oi.product_id
                  WHERE oi.order_id = o.id AND p.user_id = $2
              )
            FOR SHARE OF o
            "#,
        )
        .bind(order_id)
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;

        raw.map(OrderStatus::try_from)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    /// Sets `seller_status` on the items of `order_id` sold by `seller_id`
    ///
    /// Returns the number of items changed. Items of other sellers in the
    /// same order are never touched.
    pub async fn set_seller_status(
        conn: &mut PgConnection,
        order_id: i64,
        seller_id: i64,
        status: OrderStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE order_items oi
            SET seller_status = $3
            FROM products p
            WHERE p.id = oi.product_id
              AND oi.order_id = $1
              AND p.user_id = $2
            "#,
        )
        .bind(order_id)
        .bind(seller_id)
        .bind(status.as_str())
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

/// One purchased line with its product, as the buyer sees it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BuyerOrderLine {
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price_cents: i64,

    #[sqlx(try_from = "String")]
    pub seller_status: OrderStatus,
}

/// An order with its lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<BuyerOrderLine>,
}

impl OrderWithLines {
    /// A buyer's orders, newest first, each with its lines
    pub async fn for_buyer(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let orders = Order::list_for_user(pool, user_id).await?;

        let lines = sqlx::query_as::<_, BuyerOrderLine>(
            r#"
            SELECT oi.order_id, oi.product_id, p.product_name, oi.quantity,
                   oi.price_cents, oi.seller_status
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.user_id = $1
            ORDER BY oi.order_id, oi.id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(attach_lines(orders, lines))
    }
}

fn attach_lines(orders: Vec<Order>, lines: Vec<BuyerOrderLine>) -> Vec<OrderWithLines> {
    let mut by_order: HashMap<i64, Vec<BuyerOrderLine>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }

    orders
        .into_iter()
        .map(|order| {
            let lines = by_order.remove(&order.id).unwrap_or_default();
            OrderWithLines { order, lines }
        })
        .collect()
}

/// Flat join row: one of a seller's items together with its order and buyer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SellerOrderRow {
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
    pub payment_method: String,

    #[sqlx(try_from = "String")]
    pub order_status: OrderStatus,

    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_address: String,
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub size: String,
    pub pages: i32,
    pub quantity: i32,
    pub price_cents: i64,

    #[sqlx(try_from = "String")]
    pub seller_status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerOrderLine {
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub size: String,
    pub pages: i32,
    pub quantity: i32,
    pub price_cents: i64,
    pub seller_status: OrderStatus,
}

/// One order as seen by a seller: only that seller's lines
#[derive(Debug, Clone, Serialize)]
pub struct SellerOrder {
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
    pub payment_method: String,
    pub order_status: OrderStatus,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_address: String,
    pub lines: Vec<SellerOrderLine>,
}

impl SellerOrder {
    /// Orders containing the seller's products, newest first
    pub async fn for_seller(pool: &PgPool, seller_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SellerOrderRow>(
            r#"
            SELECT o.id AS order_id, o.created_at, o.payment_method, o.status AS order_status,
                   u.name AS buyer_name, u.email AS buyer_email, a.address AS buyer_address,
                   oi.id AS item_id, p.id AS product_id, p.product_name, p.size, p.pages,
                   oi.quantity, oi.price_cents, oi.seller_status
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN products p ON p.id = oi.product_id AND p.user_id = $1
            JOIN users u ON u.id = o.user_id
            JOIN addresses a ON a.id = o.address_id
            ORDER BY o.created_at DESC, o.id DESC, oi.id
            "#,
        )
        .bind(seller_id)
        .fetch_all(pool)
        .await?;

        Ok(group_seller_rows(rows))
    }
}

/// Folds consecutive rows of the same order into one [`SellerOrder`]
///
/// Rows must arrive ordered by order; the order of first appearance is kept.
pub fn group_seller_rows(rows: Vec<SellerOrderRow>) -> Vec<SellerOrder> {
    let mut orders: Vec<SellerOrder> = Vec::new();

    for row in rows {
        let line = SellerOrderLine {
            item_id: row.item_id,
            product_id: row.product_id,
            product_name: row.product_name,
            size: row.size,
            pages: row.pages,
            quantity: row.quantity,
            price_cents: row.price_cents,
            seller_status: row.seller_status,
        };

        match orders.last_mut() {
            Some(current) if current.order_id == row.order_id => current.lines.push(line),
            _ => orders.push(SellerOrder {
                order_id: row.order_id,
                created_at: row.created_at,
                payment_method: row.payment_method,
                order_status: row.order_status,
                buyer_name: row.buyer_name,
                buyer_email: row.buyer_email,
                buyer_address: row.buyer_address,
                lines: vec![line],
            }),
        }
    }

    orders
}

/// Headline numbers for the seller dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SellerMetrics {
    /// Orders in which the seller has shipped but not delivered items
    pub active_orders: i64,

    /// Orders in which the seller still has pending items
    pub pending_orders: i64,

    /// Stock across non-archived products
    pub total_stock: i64,

    /// Revenue from delivered items, in cents
    pub total_sales_cents: i64,
}

impl SellerMetrics {
    pub async fn for_seller(pool: &PgPool, seller_id: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SellerMetrics>(
            r#"
            SELECT
                (SELECT COUNT(DISTINCT oi.order_id) FROM order_items oi
                 JOIN products p ON p.id = oi.product_id
                 WHERE p.user_id = $1 AND oi.seller_status = 'Shipped') AS active_orders,
                (SELECT COUNT(DISTINCT oi.order_id) FROM order_items oi
                 JOIN products p ON p.id = oi.product_id
                 WHERE p.user_id = $1 AND oi.seller_status = 'Pending') AS pending_orders,
                (SELECT COALESCE(SUM(stock), 0)::BIGINT FROM products
                 WHERE user_id = $1 AND is_archive = FALSE) AS total_stock,
                (SELECT COALESCE(SUM(oi.quantity * oi.price_cents), 0)::BIGINT FROM order_items oi
                 JOIN products p ON p.id = oi.product_id
                 WHERE p.user_id = $1 AND oi.seller_status = 'Delivered') AS total_sales_cents
            "#,
        )
        .bind(seller_id)
        .fetch_one(pool)
        .await
    }
}

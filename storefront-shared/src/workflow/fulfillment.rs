/// Fulfillment: seller item updates, order status rollup, cancellation
///
/// Sellers only ever touch their own items of an order. The order status
/// is then derived from all item statuses by [`rollup_status`], in a short
/// transaction that first locks the order row and only then reads the
/// items. Since each seller's rollup starts after that seller's item
/// update committed, whichever rollup takes the lock last reads every
/// committed item update, so concurrent sellers can't leave an order
/// stuck behind its items.

use sqlx::PgPool;
use tracing::{debug, info};

use super::{Result, WorkflowError};
use crate::models::order::{Order, OrderItem, OrderStatus};

/// Order status implied by its item statuses
///
/// Delivered when every item is delivered, Shipped when every item is at
/// least shipped, Pending otherwise (including an order with no items).
pub fn rollup_status(items: &[OrderStatus]) -> OrderStatus {
    if items.is_empty() {
        return OrderStatus::Pending;
    }

    if items.iter().all(|s| *s == OrderStatus::Delivered) {
        OrderStatus::Delivered
    } else if items
        .iter()
        .all(|s| matches!(s, OrderStatus::Shipped | OrderStatus::Delivered))
    {
        OrderStatus::Shipped
    } else {
        OrderStatus::Pending
    }
}

/// Sets the status of a seller's items in an order, then re-evaluates the
/// order status
///
/// Returns the order status after the rollup.
///
/// # Errors
///
/// - `InvalidTransition` when `new_status` is Cancelled or the order is
///   already delivered or cancelled
/// - `NotFound` when the order has no items sold by `seller_id`
pub async fn update_order_item_status(
    pool: &PgPool,
    seller_id: i64,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<OrderStatus> {
    let mut tx = pool.begin().await?;

    let current = OrderItem::order_status_for_seller(&mut *tx, order_id, seller_id)
        .await?
        .ok_or(WorkflowError::NotFound("Order"))?;

    if current.is_terminal() || !new_status.is_seller_settable() {
        return Err(WorkflowError::InvalidTransition {
            from: current,
            to: new_status,
        });
    }

    let updated = OrderItem::set_seller_status(&mut *tx, order_id, seller_id, new_status).await?;
    if updated == 0 {
        return Err(WorkflowError::NotFound("Order"));
    }

    tx.commit().await?;

    info!(
        order_id,
        seller_id,
        status = %new_status,
        items = updated,
        "Seller items updated"
    );

    refresh_order_status(pool, order_id).await
}

/// Re-derives an order's status from its items
///
/// Idempotent. Delivered and cancelled orders are returned untouched.
pub async fn refresh_order_status(pool: &PgPool, order_id: i64) -> Result<OrderStatus> {
    let mut tx = pool.begin().await?;

    let order = Order::lock(&mut *tx, order_id)
        .await?
        .ok_or(WorkflowError::NotFound("Order"))?;

    if order.status.is_terminal() {
        return Ok(order.status);
    }

    let items = Order::item_statuses(&mut *tx, order_id).await?;
    let next = rollup_status(&items);

    if next != order.status {
        Order::set_status(&mut *tx, order_id, next).await?;
        info!(order_id, from = %order.status, to = %next, "Order status rolled up");
    } else {
        debug!(order_id, status = %next, "Order status unchanged");
    }

    tx.commit().await?;
    Ok(next)
}

/// Cancels one of the buyer's orders
///
/// # Errors
///
/// - `NotFound` when the order doesn't exist or belongs to someone else
/// - `InvalidTransition` when the order is already delivered or cancelled
pub async fn cancel_order(pool: &PgPool, buyer_id: i64, order_id: i64) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let mut order = Order::lock(&mut *tx, order_id)
        .await?
        .filter(|o| o.user_id == buyer_id)
        .ok_or(WorkflowError::NotFound("Order"))?;

    if !order.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(WorkflowError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Cancelled,
        });
    }

    Order::set_status(&mut *tx, order_id, OrderStatus::Cancelled).await?;
    tx.commit().await?;

    info!(order_id, buyer_id, from = %order.status, "Order cancelled");
    order.status = OrderStatus::Cancelled;
    Ok(order)
}

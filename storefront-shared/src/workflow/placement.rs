/// Order placement
///
/// Converts the selected cart lines of one user into an order. Everything
/// happens in a single transaction:
///
/// 1. the shipping address must belong to the buyer
/// 2. the selected cart rows are locked and priced
/// 3. the order and one item per line are inserted, prices captured
/// 4. the order total is written
/// 5. exactly the consumed cart rows are deleted
///
/// If any statement fails the transaction is dropped, which rolls it back:
/// no order row appears and the cart is left as it was.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use super::cart::{CartLine, CartSelection};
use super::{Result, WorkflowError};
use crate::models::address::Address;
use crate::models::order::{Order, OrderItem};

/// Checkout form contents
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub address_id: i64,
    pub payment_method: String,
    pub selected_product_ids: Vec<i64>,
}

/// Places an order from the buyer's selected cart lines
///
/// Returns the new order with its final total.
///
/// # Errors
///
/// - `EmptySelection` when nothing was selected or no selected product is
///   in the cart
/// - `NotFound` when the address isn't the buyer's
/// - `OrderPlacementFailed` when the store fails mid-transaction
pub async fn place_order(pool: &PgPool, user_id: i64, request: PlaceOrder) -> Result<Order> {
    let selection = CartSelection::new(request.selected_product_ids)?;

    let mut tx = pool.begin().await.map_err(placement_failed)?;

    if !Address::is_owned_by(&mut *tx, request.address_id, user_id)
        .await
        .map_err(placement_failed)?
    {
        return Err(WorkflowError::NotFound("Address"));
    }

    let lines = CartLine::lock_selected(&mut *tx, user_id, selection.product_ids())
        .await
        .map_err(placement_failed)?;

    if lines.is_empty() {
        return Err(WorkflowError::EmptySelection);
    }

    let mut order = Order::insert_pending(&mut *tx, user_id, request.address_id, &request.payment_method)
        .await
        .map_err(placement_failed)?;

    let mut total_cents: i64 = 0;
    for line in &lines {
        OrderItem::insert(&mut *tx, order.id, line.product_id, line.quantity, line.price_cents)
            .await
            .map_err(placement_failed)?;
        total_cents += line.line_total_cents;
    }

    Order::set_total(&mut *tx, order.id, total_cents)
        .await
        .map_err(placement_failed)?;

    let consumed: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    CartLine::consume(&mut *tx, user_id, &consumed)
        .await
        .map_err(placement_failed)?;

    tx.commit().await.map_err(placement_failed)?;

    order.total_amount_cents = total_cents;

    info!(
        order_id = order.id,
        user_id,
        items = lines.len(),
        total_cents,
        "Order placed"
    );

    Ok(order)
}

fn placement_failed(err: sqlx::Error) -> WorkflowError {
    warn!(error = %err, "Order placement rolled back");
    WorkflowError::OrderPlacementFailed(err)
}

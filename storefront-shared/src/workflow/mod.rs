/// Cart-to-order workflow
///
/// This is the part of the system with multi-step consistency
/// requirements, layered over the plain models:
///
/// - `cart`: priced cart views and checked cart mutations
/// - `placement`: turns selected cart lines into an order in one transaction
/// - `fulfillment`: per-seller item status updates, order status rollup
///   and buyer cancellation
///
/// Every operation returns [`WorkflowError`], which the API maps to HTTP
/// responses.

pub mod cart;
pub mod fulfillment;
pub mod placement;

use crate::models::order::OrderStatus;
use thiserror::Error;

/// Workflow failures
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Checkout selection was empty or matched no cart line
    #[error("No cart items selected")]
    EmptySelection,

    /// Quantity below 1 or above the per-line cap
    #[error("Quantity must be between 1 and {max}, got {0}", max = crate::models::cart::MAX_LINE_QUANTITY)]
    InvalidQuantity(i32),

    /// The entity doesn't exist or isn't visible to the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requested status change isn't allowed from the current status
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The placement transaction failed and was rolled back
    #[error("Order placement failed: {0}")]
    OrderPlacementFailed(#[source] sqlx::Error),

    /// Any other store failure
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

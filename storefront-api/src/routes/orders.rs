/// Buyer order endpoints
///
/// - `GET /orders_dashboard` - the buyer's orders grouped by status
/// - `POST /cancel_order/:id` - cancel a pending or shipped order

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Json,
};
use serde::Serialize;
use storefront_shared::{
    auth::middleware::AuthContext,
    models::order::{OrderStatus, OrderWithLines},
    workflow::fulfillment,
};

/// Orders sharing one status
#[derive(Debug, Serialize)]
pub struct OrderGroup {
    pub status: OrderStatus,
    pub orders: Vec<OrderWithLines>,
}

#[derive(Debug, Serialize)]
pub struct OrdersDashboard {
    pub groups: Vec<OrderGroup>,
}

pub async fn orders_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<OrdersDashboard>> {
    let orders = OrderWithLines::for_buyer(&state.db, auth.user_id).await?;
    Ok(Json(OrdersDashboard {
        groups: group_by_status(orders),
    }))
}

/// One group per status in lifecycle order, empty groups included
pub fn group_by_status(orders: Vec<OrderWithLines>) -> Vec<OrderGroup> {
    let mut groups: Vec<OrderGroup> = OrderStatus::all()
        .into_iter()
        .map(|status| OrderGroup {
            status,
            orders: Vec::new(),
        })
        .collect();

    for order in orders {
        if let Some(group) = groups.iter_mut().find(|g| g.status == order.order.status) {
            group.orders.push(order);
        }
    }

    groups
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<i64>,
) -> ApiResult<Redirect> {
    fulfillment::cancel_order(&state.db, auth.user_id, order_id).await?;
    Ok(Redirect::to("/orders_dashboard"))
}

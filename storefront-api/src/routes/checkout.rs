/// Checkout endpoints
///
/// - `GET /checkout` - whole cart plus the buyer's addresses
/// - `POST /checkout` - only the lines named in `selected_items`
/// - `POST /place_order` - turn the selected lines into an order
///
/// `selected_items` is a JSON array of product ids, as posted by the cart
/// page's checkboxes (`[3, 7]`).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, response::Redirect, Extension, Form, Json};
use serde::{Deserialize, Serialize};
use storefront_shared::{
    auth::middleware::AuthContext,
    models::address::Address,
    workflow::{
        cart::{CartSelection, CartSummary},
        placement::{self, PlaceOrder},
    },
};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub cart: CartSummary,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionForm {
    pub selected_items: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderForm {
    pub address_id: i64,

    /// Stored in a `VARCHAR(50)` column
    #[validate(length(max = 50, message = "Payment method is too long"))]
    pub payment_method: String,

    pub selected_items: Option<String>,
}

pub async fn review_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CheckoutView>> {
    let cart = CartSummary::for_user(&state.db, auth.user_id, None).await?;
    let addresses = Address::list_for_user(&state.db, auth.user_id).await?;

    Ok(Json(CheckoutView { cart, addresses }))
}

/// Prices the selected lines
///
/// # Errors
///
/// - `400 empty_selection`: nothing selected, or nothing selected is in
///   the cart
pub async fn review_selection(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<SelectionForm>,
) -> ApiResult<Json<CheckoutView>> {
    let selection = CartSelection::parse(form.selected_items.as_deref())?;
    let cart = selection.for_checkout(&state.db, auth.user_id).await?;
    let addresses = Address::list_for_user(&state.db, auth.user_id).await?;

    Ok(Json(CheckoutView { cart, addresses }))
}

/// Places the order and sends the buyer to their orders
///
/// # Errors
///
/// - `400 empty_selection`: nothing to order
/// - `422`: payment method missing or longer than 50 characters
/// - `404`: the address isn't the buyer's
/// - `500 order_placement_failed`: rolled back, cart untouched
pub async fn place_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<PlaceOrderForm>,
) -> ApiResult<Redirect> {
    form.validate()?;

    let payment_method = form.payment_method.trim();
    if payment_method.is_empty() {
        return Err(ApiError::invalid("payment_method", "Payment method is required"));
    }

    let selection = CartSelection::parse(form.selected_items.as_deref())?;

    let order = placement::place_order(
        &state.db,
        auth.user_id,
        PlaceOrder {
            address_id: form.address_id,
            payment_method: payment_method.to_string(),
            selected_product_ids: selection.product_ids().to_vec(),
        },
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        order_id = order.id,
        total_cents = order.total_amount_cents,
        "Order placed"
    );

    Ok(Redirect::to("/orders_dashboard"))
}

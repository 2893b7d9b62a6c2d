/// Cart endpoints
///
/// Mutations are form posts answered with a redirect back to `/cart`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, response::Redirect, Extension, Form, Json};
use serde::Deserialize;
use storefront_shared::{
    auth::middleware::AuthContext,
    workflow::cart::{self, CartSummary},
};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i64,
}

/// Whole cart with line totals and the grand total
pub async fn view_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CartSummary>> {
    let summary = CartSummary::for_user(&state.db, auth.user_id, None).await?;
    Ok(Json(summary))
}

/// Adds a product, merging into an existing line
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<AddToCartForm>,
) -> ApiResult<Redirect> {
    let item = cart::add_item(&state.db, auth.user_id, form.product_id, form.quantity).await?;

    tracing::debug!(
        user_id = auth.user_id,
        product_id = item.product_id,
        quantity = item.quantity,
        "Added to cart"
    );

    Ok(Redirect::to("/cart"))
}

pub async fn update_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<UpdateCartForm>,
) -> ApiResult<Redirect> {
    cart::set_quantity(&state.db, auth.user_id, form.product_id, form.quantity).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<RemoveFromCartForm>,
) -> ApiResult<Redirect> {
    cart::remove_item(&state.db, auth.user_id, form.product_id).await?;
    Ok(Redirect::to("/cart"))
}

/// Address book endpoints
///
/// - `GET /addresses_dashboard`
/// - `POST /add_address` (form: `name`, `address`, `phone`)
/// - `POST /delete_address/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde::Deserialize;
use storefront_shared::{
    auth::middleware::AuthContext,
    models::address::{Address, CreateAddress},
};
use validator::Validate;

const DASHBOARD: &str = "/addresses_dashboard";

#[derive(Debug, Deserialize, Validate)]
pub struct AddressForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Address>>> {
    Ok(Json(Address::list_for_user(&state.db, auth.user_id).await?))
}

pub async fn add_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<AddressForm>,
) -> ApiResult<Redirect> {
    form.validate()?;

    let address = Address::create(
        &state.db,
        auth.user_id,
        CreateAddress {
            name: form.name.trim().to_string(),
            address: form.address.trim().to_string(),
            phone: form.phone.trim().to_string(),
        },
    )
    .await?;

    tracing::debug!(user_id = auth.user_id, address_id = address.id, "Address added");
    Ok(Redirect::to(DASHBOARD))
}

/// Deletes one of the user's addresses
///
/// An address already used by an order can't be deleted (`400`).
pub async fn delete_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(address_id): Path<i64>,
) -> ApiResult<Redirect> {
    let deleted = Address::delete(&state.db, address_id, auth.user_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                ApiError::BadRequest("Address is used by an order and can't be deleted".to_string())
            }
            other => other.into(),
        })?;

    if !deleted {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    Ok(Redirect::to(DASHBOARD))
}

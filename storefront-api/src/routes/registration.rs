/// Seller registration
///
/// `POST /seller_registration` (multipart, buyers only). Text fields:
/// `business_name`, `contact_number`, `email`, `profile_description`,
/// `payment_details`. Optional files: `id_proof`, `product_photo`. The
/// request waits in the admin dashboard until it is approved or rejected.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::forms::MultipartForm,
};
use axum::{
    extract::{Multipart, State},
    response::Redirect,
    Extension,
};
use storefront_shared::{
    auth::middleware::AuthContext,
    models::seller_request::{CreateSellerRequest, SellerRequest},
};

pub async fn submit_seller_registration(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Redirect> {
    let form = MultipartForm::read(multipart).await?;

    let business_name = form.required("business_name")?.to_string();
    let contact_number = form.required("contact_number")?.to_string();
    let email = form.required("email")?.to_string();
    if !email.contains('@') {
        return Err(ApiError::invalid("email", "Invalid email format"));
    }

    let id_proof = form.save_file(&state.uploads, "id_proof").await?;
    let product_photo = form.save_file(&state.uploads, "product_photo").await?;

    let created = SellerRequest::create(
        &state.db,
        auth.user_id,
        CreateSellerRequest {
            business_name,
            contact_number,
            email,
            id_proof: id_proof.clone(),
            profile_description: form.text("profile_description").unwrap_or_default().to_string(),
            payment_details: form.text("payment_details").unwrap_or_default().to_string(),
            product_photo: product_photo.clone(),
        },
    )
    .await;

    match created {
        Ok(request) => {
            tracing::info!(user_id = auth.user_id, request_id = request.id, "Seller request submitted");
            Ok(Redirect::to("/buyer_dashboard"))
        }
        Err(e) => {
            for stored in [id_proof, product_photo].into_iter().flatten() {
                if let Err(cleanup) = state.uploads.remove(&stored).await {
                    tracing::warn!(error = %cleanup, file = %stored, "Orphaned registration document");
                }
            }
            Err(e.into())
        }
    }
}

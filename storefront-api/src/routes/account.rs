/// Account settings endpoints
///
/// - `POST /update-profile` - JSON `{name, email}`
/// - `POST /change-password` - JSON `{currentPassword, newPassword}`
/// - `POST /update_seller_account` - seller form with optional new password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, response::Redirect, Extension, Form, Json};
use serde::{Deserialize, Serialize};
use storefront_shared::{
    auth::{middleware::AuthContext, password},
    models::user::{IdentityConflict, User},
};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SellerAccountForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Blank keeps the current password
    #[serde(default)]
    pub password: String,
}

/// Rejects a name or email that belongs to another account
async fn ensure_identity_free(
    state: &AppState,
    user_id: i64,
    name: &str,
    email: &str,
) -> ApiResult<()> {
    match User::find_identity_conflict(&state.db, name, email, Some(user_id)).await? {
        Some(IdentityConflict::Name) => Err(ApiError::Conflict("Name already taken".to_string())),
        Some(IdentityConflict::Email) => {
            Err(ApiError::Conflict("Email already exists".to_string()))
        }
        None => Ok(()),
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let name = req.name.trim();
    let email = req.email.trim();
    ensure_identity_free(&state, auth.user_id, name, email).await?;

    let mut conn = state.db.acquire().await?;
    User::update_profile(&mut *conn, auth.user_id, name, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = auth.user_id, "Profile updated");
    Ok(MessageResponse::new("Profile updated successfully"))
}

/// Changes the password after checking the current one
///
/// # Errors
///
/// - `401`: current password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !password::verify_password_blocking(req.current_password, user.password_hash).await? {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }

    let hash = password::hash_password_blocking(req.new_password).await?;
    let mut conn = state.db.acquire().await?;
    User::update_password(&mut *conn, auth.user_id, &hash).await?;

    tracing::info!(user_id = auth.user_id, "Password changed");
    Ok(MessageResponse::new("Password changed successfully"))
}

/// Updates a seller's name and email, and the password when one is given
pub async fn update_seller_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<SellerAccountForm>,
) -> ApiResult<Redirect> {
    form.validate()?;

    let name = form.name.trim();
    let email = form.email.trim();
    ensure_identity_free(&state, auth.user_id, name, email).await?;

    let new_hash = match form.password.trim() {
        "" => None,
        pw if pw.len() < 8 => {
            return Err(ApiError::invalid(
                "password",
                "Password must be at least 8 characters",
            ))
        }
        pw => Some(password::hash_password_blocking(pw.to_string()).await?),
    };

    let mut tx = state.db.begin().await?;
    User::update_profile(&mut *tx, auth.user_id, name, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if let Some(hash) = &new_hash {
        User::update_password(&mut *tx, auth.user_id, hash).await?;
    }
    tx.commit().await?;

    tracing::info!(
        user_id = auth.user_id,
        password_changed = new_hash.is_some(),
        "Seller account updated"
    );
    Ok(Redirect::to("/seller_dashboard"))
}

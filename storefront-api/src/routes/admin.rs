/// Admin endpoints, mounted under `/admin`
///
/// - `GET /dashboard` - pending seller requests and all users
/// - `POST /approve_request/:id`, `POST /reject_request/:id`
/// - `POST /archive_user/:id`, `POST /unarchive_user/:id`
/// - `POST /change_role/:id` (form field `role`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use storefront_shared::{
    auth::middleware::AuthContext,
    models::{
        seller_request::SellerRequest,
        user::{Role, User, UserStatus},
    },
};

const DASHBOARD: &str = "/admin/dashboard";

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub seller_requests: Vec<SellerRequest>,
    pub users: Vec<User>,
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<AdminDashboard>> {
    let seller_requests = SellerRequest::list_pending(&state.db).await?;
    let users = User::list(&state.db).await?;

    Ok(Json(AdminDashboard {
        seller_requests,
        users,
    }))
}

/// Approves a pending request and makes its user a seller
pub async fn approve_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<i64>,
) -> ApiResult<Redirect> {
    let request = SellerRequest::approve(&state.db, request_id)
        .await?
        .ok_or_else(request_not_found)?;

    tracing::info!(
        admin_id = auth.user_id,
        request_id,
        user_id = request.user_id,
        "Seller request approved"
    );
    Ok(Redirect::to(DASHBOARD))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<i64>,
) -> ApiResult<Redirect> {
    SellerRequest::reject(&state.db, request_id)
        .await?
        .ok_or_else(request_not_found)?;

    tracing::info!(admin_id = auth.user_id, request_id, "Seller request rejected");
    Ok(Redirect::to(DASHBOARD))
}

fn request_not_found() -> ApiError {
    ApiError::NotFound("Seller request not found or already reviewed".to_string())
}

pub async fn archive_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> ApiResult<Redirect> {
    forbid_self(&auth, user_id)?;
    set_status(&state, &auth, user_id, UserStatus::Archived).await
}

pub async fn unarchive_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
) -> ApiResult<Redirect> {
    set_status(&state, &auth, user_id, UserStatus::Active).await
}

async fn set_status(
    state: &AppState,
    auth: &AuthContext,
    user_id: i64,
    status: UserStatus,
) -> ApiResult<Redirect> {
    if !User::set_status(&state.db, user_id, status).await? {
        return Err(ApiError::NotFound(format!(
            "User not found or already {}",
            status.as_str()
        )));
    }

    tracing::info!(admin_id = auth.user_id, user_id, status = status.as_str(), "User status changed");
    Ok(Redirect::to(DASHBOARD))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleForm {
    pub role: String,
}

pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
    Form(form): Form<ChangeRoleForm>,
) -> ApiResult<Redirect> {
    forbid_self(&auth, user_id)?;

    let role = Role::parse(form.role.trim())
        .ok_or_else(|| ApiError::invalid("role", format!("Unknown role '{}'", form.role)))?;

    let mut conn = state.db.acquire().await?;
    if !User::set_role(&mut *conn, user_id, role).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = auth.user_id, user_id, %role, "User role changed");
    Ok(Redirect::to(DASHBOARD))
}

/// Admins can't archive or demote themselves out of the dashboard
fn forbid_self(auth: &AuthContext, user_id: i64) -> ApiResult<()> {
    if auth.user_id == user_id {
        return Err(ApiError::BadRequest(
            "You cannot change your own account from the admin dashboard".to_string(),
        ));
    }
    Ok(())
}

/// Authentication endpoints
///
/// - `POST /signup` - create a buyer account
/// - `POST /login` - sign in, set the session cookie, redirect
/// - `GET /logout` - clear the session cookie
///
/// All three take classic form posts and answer with `303` redirects.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use storefront_shared::{
    auth::{
        jwt::{create_token, Claims},
        middleware::SESSION_COOKIE,
        password,
    },
    models::user::{CreateUser, IdentityConflict, Role, User},
};
use validator::Validate;

/// Signup form
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,

    /// Page to return to after signing in
    pub next: Option<String>,
}

/// Creates a buyer account
///
/// # Errors
///
/// - `422`: validation failed
/// - `409`: name or email taken, or the password is already used by
///   another account
pub async fn signup(
    State(state): State<AppState>,
    Form(req): Form<SignupRequest>,
) -> ApiResult<Redirect> {
    req.validate()?;

    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();

    match User::find_identity_conflict(&state.db, &name, &email, None).await? {
        Some(IdentityConflict::Name) => {
            return Err(ApiError::Conflict(
                "That name is already taken, please use a different name".to_string(),
            ))
        }
        Some(IdentityConflict::Email) => {
            return Err(ApiError::Conflict(
                "That email is already registered, please use a different email".to_string(),
            ))
        }
        None => {}
    }

    let hashes = User::all_password_hashes(&state.db).await?;
    if password::is_password_in_use_blocking(req.password.clone(), hashes).await? {
        return Err(ApiError::Conflict(
            "This password is already in use, please choose a different password".to_string(),
        ));
    }

    let password_hash = password::hash_password_blocking(req.password).await?;

    // A concurrent signup can still win the race; the unique constraints
    // turn that into a 409 through `From<sqlx::Error>`.
    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
            role: Role::Buyer,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "Account created");

    Ok(Redirect::to("/login"))
}

/// Signs in an active user
///
/// Redirects to `next` when it's a local path, otherwise to the role's
/// dashboard.
///
/// # Errors
///
/// - `401`: unknown email, wrong password or archived account
pub async fn login(
    State(state): State<AppState>,
    Form(req): Form<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid credentials or inactive account".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active() {
        tracing::info!(user_id = user.id, "Login refused for archived account");
        return Err(invalid());
    }

    if !password::verify_password_blocking(req.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(invalid());
    }

    let claims = Claims::new(user.id, user.role, state.config.session_ttl());
    let token = create_token(&claims, state.session_secret())?;
    let cookie = session_cookie(&token, state.config.session.ttl_hours * 3600, state.config.api.production);

    let target = req
        .next
        .as_deref()
        .and_then(local_path)
        .unwrap_or_else(|| user.role.home_path())
        .to_string();

    tracing::info!(user_id = user.id, role = %user.role, "User signed in");

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(&target)))
}

/// Clears the session cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session_cookie("", 0, state.config.api.production);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/login"))
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Accepts only same-site paths, so `next` can't send users elsewhere
fn local_path(next: &str) -> Option<&str> {
    let next = next.trim();
    let is_local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    is_local.then_some(next)
}

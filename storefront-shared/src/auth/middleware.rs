/// Session authentication
///
/// Resolves the session token on a request into an [`AuthContext`]. The
/// token is read from `Authorization: Bearer <token>` first and from the
/// `session` cookie second. A valid signature is not enough: the user row
/// is reloaded so that archived accounts are locked out immediately and a
/// role change (seller approval, admin edit) applies on the next request.
///
/// The API's gate layer calls [`authenticate`] and stores the resulting
/// context in the request extensions, where handlers pick it up:
///
/// ```no_run
/// use axum::Extension;
/// use storefront_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}", auth.name)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{Role, User};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// The signed-in user, as loaded for this request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Why a request carries no usable session
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing session token")]
    MissingCredentials,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session has expired")]
    Expired,

    /// Token names a user that no longer exists
    #[error("Unknown user")]
    UnknownUser,

    #[error("Account is archived")]
    Archived,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Pulls the session token out of the request headers
///
/// A bearer token wins over the cookie when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// Finds a cookie by name across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Resolves the request's session into the current user
///
/// # Errors
///
/// Every failure means "not signed in"; `DatabaseError` is the only one
/// that isn't the client's doing.
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::Expired,
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    if !user.is_active() {
        debug!(user_id = user.id, "Rejecting session of archived user");
        return Err(AuthError::Archived);
    }

    if user.role != claims.role {
        debug!(
            user_id = user.id,
            token_role = %claims.role,
            current_role = %user.role,
            "Role changed since login"
        );
    }

    Ok(AuthContext::from_user(&user))
}
